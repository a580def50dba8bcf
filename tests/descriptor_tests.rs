//! Load, validate and render a complete descriptor.

use omnibus_config::deployment::{DatabaseTarget, Deployment};
use omnibus_config::descriptor::{load, load_file, render, LoadError, ParseError, Value};
use omnibus_config::validation::{advisories, validate, Violation};
use omnibus_config::Report;

mod common;

#[test]
fn test_container_descriptor_is_valid() {
    let settings = load(common::CONTAINER_DESCRIPTOR).unwrap();
    assert_eq!(validate(&settings), Ok(()));
    assert!(advisories(&settings).is_empty(), "{:?}", advisories(&settings));
    assert_eq!(settings.get_str("gitaly.storage_class"), Some("standard"));
    assert_eq!(
        settings.get_integer("gitlab_shell.service.securityContext.fsGroup"),
        Some(1000)
    );
}

#[test]
fn test_round_trip_through_render() {
    let settings = load(common::CONTAINER_DESCRIPTOR).unwrap();
    let rendered = render(&settings);
    let reloaded = load(&rendered).unwrap();

    assert_eq!(reloaded, settings);
    assert_eq!(reloaded.len(), settings.len());
    // Rendering is canonical.
    assert_eq!(render(&reloaded), rendered);
}

#[test]
fn test_round_trip_of_literal_shapes() {
    let sources = [
        "gitlab_rails({ 'db_host' => 'db', 'db_port' => 5432 })",
        "gitlab_rails['ssh_host_rsa_key'] = \"line\\none\\ttab\\0nul\"",
        "gitlab_shell['service'] = {}",
        "gitaly['security_context'] = { 'runAsUser' => 0, 'extra' => { 'nested' => {} }, }",
        "gitlab_rails['db_port'] = -9_223_372_036_854_775_808",
        "gitlab_rails['db_host'] = 'quote \\' and \\\\ slash'",
    ];
    for source in sources {
        let settings = load(source).unwrap();
        let rendered = render(&settings);
        let reloaded = load(&rendered).unwrap_or_else(|e| panic!("{:?} rendered as {:?}: {}", source, rendered, e));
        assert_eq!(reloaded, settings, "{:?}", source);
        assert_eq!(render(&reloaded), rendered);
    }

    let escaped = load("gitlab_rails['ssh_host_rsa_key'] = \"a\\nb\\0\"").unwrap();
    assert_eq!(escaped.get_str("gitlab_rails.ssh_host_rsa_key"), Some("a\nb\0"));
    let min = load("gitlab_rails['db_port'] = -9_223_372_036_854_775_808").unwrap();
    assert_eq!(min.get_integer("gitlab_rails.db_port"), Some(i64::MIN));
}

#[test]
fn test_round_trip_is_independent_of_ordering() {
    let forward = load("nginx['enable'] = true\nredis['enable'] = false\n").unwrap();
    let backward = load("redis['enable'] = false\n\n# comment\nnginx['enable'] = true").unwrap();
    assert_eq!(forward, backward);
}

#[test]
fn test_port_boundaries() {
    for (port, ok) in [(-1, false), (0, true), (65535, true), (65536, false)] {
        let settings = load(&format!("gitlab_rails['webservice_external_port'] = {}", port)).unwrap();
        let result = validate(&settings);
        assert_eq!(result.is_ok(), ok, "port {}", port);
        if let Err(errors) = result {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "gitlab_rails.webservice_external_port");
            assert!(matches!(errors[0].reason, Violation::OutOfRange { .. }));
        }
    }
}

#[test]
fn test_missing_run_as_user() {
    let settings = load(
        "gitlab_rails['security_context'] = {\n  'runAsGroup' => 1000,\n  'fsGroup' => 1000\n}\n",
    )
    .unwrap();
    let errors = validate(&settings).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "gitlab_rails.security_context");
    assert_eq!(
        errors[0].reason,
        Violation::MissingField {
            name: "runAsUser".into()
        }
    );
    assert!(errors[0].to_string().contains("runAsUser"));
}

#[test]
fn test_missing_run_as_user_in_nested_block() {
    let settings = load(
        "gitlab_shell['service'] = { 'securityContext' => { 'runAsGroup' => 1, 'fsGroup' => 1 } }",
    )
    .unwrap();
    let errors = validate(&settings).unwrap_err();
    assert_eq!(errors[0].field, "gitlab_shell.service.securityContext");
    assert_eq!(
        errors[0].reason,
        Violation::MissingField {
            name: "runAsUser".into()
        }
    );
}

#[test]
fn test_validation_is_idempotent() {
    let settings = load(common::CONTAINER_DESCRIPTOR).unwrap();
    assert_eq!(validate(&settings), validate(&settings));

    let invalid = load("nginx['enable'] = 1\nredis['x'] = true\ngitlab_rails['db_port'] = 99999").unwrap();
    let first = validate(&invalid).unwrap_err();
    let second = validate(&invalid).unwrap_err();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_disabled_shell_settings_are_independent() {
    let populated = load(
        "gitlab_shell['enable'] = false\n\
         gitlab_rails['gitlab_shell_ssh_port'] = 0\n\
         gitlab_rails['gitlab_shell_ssh_path'] = '/bin/false'\n",
    )
    .unwrap();
    let absent = load("gitlab_shell['enable'] = false\n").unwrap();

    assert!(validate(&populated).is_ok());
    assert!(validate(&absent).is_ok());
    assert_eq!(populated.get_bool("gitlab_shell.enable"), Some(false));
    assert_eq!(absent.get_bool("gitlab_shell.enable"), Some(false));
}

#[test]
fn test_external_database_scenario() {
    let settings = load(
        "gitlab_rails['db_adapter'] = 'postgresql'\n\
         gitlab_rails['db_host'] = 'gitlab-postgresql'\n\
         gitlab_rails['db_port'] = 5432\n\
         gitlab_rails['db_username'] = 'gitlab'\n\
         gitlab_rails['db_password'] = 'gitlab'\n\
         gitlab_rails['db_database'] = 'gitlab'\n\
         postgresql['enable'] = false\n",
    )
    .unwrap();

    assert!(validate(&settings).is_ok());
    assert_eq!(settings.get_bool("postgresql.enable"), Some(false));

    let deployment = Deployment::from_settings(&settings).unwrap();
    assert!(!deployment.postgresql.enable);
    match deployment.database() {
        DatabaseTarget::External(db) => {
            assert_eq!(db.adapter, "postgresql");
            assert_eq!(db.host, "gitlab-postgresql");
            assert_eq!(db.port, 5432);
            assert_eq!(db.username, "gitlab");
            assert_eq!(db.password, "gitlab");
            assert_eq!(db.database, "gitlab");
        }
        other => panic!("expected external database, got {:?}", other),
    }
}

#[test]
fn test_duplicate_and_overlapping_keys() {
    let err = load("redis['enable'] = true\n\nredis['enable'] = true\n").unwrap_err();
    assert_eq!(
        err,
        ParseError::DuplicateKey {
            key: "redis.enable".into(),
            line: 3,
            first_line: 1
        }
    );

    let err = load("redis['master']['enable'] = true\nredis['master'] = { 'enable' => true }\n").unwrap_err();
    assert!(matches!(err, ParseError::ConflictingKey { line: 2, existing_line: 1, .. }));
}

#[test]
fn test_sshd_gate_disagreement_is_advised() {
    let source = common::CONTAINER_DESCRIPTOR.replace("service['sshd'] = false", "service['sshd'] = true");
    let settings = load(&source).unwrap();
    assert!(validate(&settings).is_ok());

    let found = advisories(&settings);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].keys, vec!["openssh.enable", "service.sshd"]);
}

#[test]
fn test_typed_view_of_container_descriptor() {
    let deployment = Deployment::from_settings(&load(common::CONTAINER_DESCRIPTOR).unwrap()).unwrap();
    assert!(!deployment.gitlab_shell.enable);
    assert!(!deployment.sshd_enabled());
    assert_eq!(deployment.gitlab_rails.webservice_external_port, Some(80));
    assert_eq!(deployment.security_contexts().len(), 3);
    assert!(deployment
        .security_contexts()
        .iter()
        .all(|(_, ctx)| ctx.run_as_user == 1000 && ctx.run_as_group == 1000 && ctx.fs_group == 1000));
}

#[test]
fn test_load_file_and_report() {
    let (_dir, path) = common::write_temp_descriptor(common::CONTAINER_DESCRIPTOR);
    let settings = load_file(&path).unwrap();
    assert_eq!(settings.get("nginx.enable"), Some(&Value::Bool(true)));

    let (_, report) = Report::check_file(&path, &Default::default()).unwrap();
    assert!(report.passes(true));
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(load_file(&path), Err(LoadError::Io { .. })));
}

#[test]
fn test_load_file_reports_parse_position() {
    let (_dir, path) = common::write_temp_descriptor("nginx['enable'] = true\ngitaly['security_context'] = {\n");
    match load_file(&path) {
        Err(LoadError::Parse { source, .. }) => {
            assert_eq!(source, ParseError::UnterminatedBlock { line: 2, column: 30 });
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}
