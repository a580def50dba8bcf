//! The schema table of known descriptor keys.
//!
//! Every key the validator recognizes is listed in [`SCHEMA`] with its
//! expected kind, constraint and owning subsystem. Keys not listed here, and
//! not nested under a listed mapping, are unknown.

use std::fmt;

use serde::Serialize;

use crate::descriptor::Kind;

/// Largest value accepted for a user or group id.
pub const MAX_ID: i64 = u32::MAX as i64;

/// Largest TCP port. `0` marks a disabled service.
pub const MAX_PORT: i64 = 65_535;

/// Embedded subsystem a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    EntryPoint,
    Proxy,
    WebService,
    ShellSubsystem,
    ProcessSupervisor,
    SecureShell,
    Storage,
    ShellService,
    Cache,
    Database,
    Metrics,
    Registry,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Subsystem::EntryPoint => "entry point",
            Subsystem::Proxy => "proxy",
            Subsystem::WebService => "web service",
            Subsystem::ShellSubsystem => "shell subsystem",
            Subsystem::ProcessSupervisor => "process supervisor",
            Subsystem::SecureShell => "secure shell",
            Subsystem::Storage => "storage",
            Subsystem::ShellService => "shell service",
            Subsystem::Cache => "cache",
            Subsystem::Database => "database",
            Subsystem::Metrics => "metrics",
            Subsystem::Registry => "registry",
        };
        f.write_str(name)
    }
}

/// Value constraint applied after the kind check.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Constraint {
    None,
    /// Integer within `[min, max]`.
    Range { min: i64, max: i64 },
    /// `http` or `https` URL with a host.
    HttpUrl,
    /// Absolute filesystem path.
    AbsolutePath,
    /// Non-empty string.
    NonEmpty,
    /// Orchestrator resource name (DNS-1123 subdomain).
    ResourceName,
    /// String from a fixed set.
    OneOf { values: &'static [&'static str] },
    /// Mapping with a fixed set of fields.
    Fields { fields: &'static [FieldSpec] },
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::None => Ok(()),
            Constraint::Range { min, max } if *min == 0 && *max == MAX_PORT => {
                f.write_str("port [0, 65535]")
            }
            Constraint::Range { min, max } => write!(f, "[{}, {}]", min, max),
            Constraint::HttpUrl => f.write_str("http(s) URL"),
            Constraint::AbsolutePath => f.write_str("absolute path"),
            Constraint::NonEmpty => f.write_str("non-empty"),
            Constraint::ResourceName => f.write_str("resource name"),
            Constraint::OneOf { values } => write!(f, "one of {}", values.join(", ")),
            Constraint::Fields { fields } => {
                let names: Vec<String> = fields
                    .iter()
                    .map(|field| {
                        if field.required {
                            field.name.to_string()
                        } else {
                            format!("{}?", field.name)
                        }
                    })
                    .collect();
                write!(f, "{{{}}}", names.join(", "))
            }
        }
    }
}

/// A field of a structured mapping.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: Kind,
    pub constraint: Constraint,
    pub required: bool,
}

/// A known top-level key.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SettingSpec {
    pub key: &'static str,
    pub kind: Kind,
    pub constraint: Constraint,
    pub subsystem: Subsystem,
    /// Value must be hidden in rendered output.
    pub sensitive: bool,
    pub note: Option<&'static str>,
}

const PORT: Constraint = Constraint::Range {
    min: 0,
    max: MAX_PORT,
};

const ID: Constraint = Constraint::Range { min: 0, max: MAX_ID };

pub const SECURITY_CONTEXT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "runAsUser",
        kind: Kind::Integer,
        constraint: ID,
        required: true,
    },
    FieldSpec {
        name: "runAsGroup",
        kind: Kind::Integer,
        constraint: ID,
        required: true,
    },
    FieldSpec {
        name: "fsGroup",
        kind: Kind::Integer,
        constraint: ID,
        required: true,
    },
    FieldSpec {
        name: "runAsNonRoot",
        kind: Kind::Bool,
        constraint: Constraint::None,
        required: false,
    },
];

const SECURITY_CONTEXT: Constraint = Constraint::Fields {
    fields: SECURITY_CONTEXT_FIELDS,
};

const SHELL_SERVICE_FIELDS: &[FieldSpec] = &[FieldSpec {
    name: "securityContext",
    kind: Kind::Map,
    constraint: SECURITY_CONTEXT,
    required: true,
}];

const SSHD_OVERLAP: &str =
    "`openssh.enable` and `service.sshd` both gate the SSH daemon; keep them in agreement";

const fn spec(key: &'static str, kind: Kind, constraint: Constraint, subsystem: Subsystem) -> SettingSpec {
    SettingSpec {
        key,
        kind,
        constraint,
        subsystem,
        sensitive: false,
        note: None,
    }
}

const fn toggle(key: &'static str, subsystem: Subsystem) -> SettingSpec {
    spec(key, Kind::Bool, Constraint::None, subsystem)
}

/// Every recognized key.
pub static SCHEMA: &[SettingSpec] = &[
    spec("external_url", Kind::String, Constraint::HttpUrl, Subsystem::EntryPoint),
    // Proxy
    toggle("nginx.enable", Subsystem::Proxy),
    toggle("nginx.redirect_http_to_https", Subsystem::Proxy),
    toggle("nginx.listen_https", Subsystem::Proxy),
    // Web service
    spec("gitlab_rails.webservice_external_port", Kind::Integer, PORT, Subsystem::WebService),
    spec("gitlab_rails.gitlab_shell_ssh_port", Kind::Integer, PORT, Subsystem::WebService),
    spec("gitlab_rails.gitlab_shell_ssh_path", Kind::String, Constraint::AbsolutePath, Subsystem::WebService),
    spec("gitlab_rails.ssh_host_rsa_key", Kind::String, Constraint::AbsolutePath, Subsystem::WebService),
    spec("gitlab_rails.ssh_host_dss_key", Kind::String, Constraint::AbsolutePath, Subsystem::WebService),
    spec("gitlab_rails.ssh_host_ecdsa_key", Kind::String, Constraint::AbsolutePath, Subsystem::WebService),
    spec("gitlab_rails.ssh_host_ed25519_key", Kind::String, Constraint::AbsolutePath, Subsystem::WebService),
    spec("gitlab_rails.security_context", Kind::Map, SECURITY_CONTEXT, Subsystem::WebService),
    // Shell
    toggle("gitlab_shell.enable", Subsystem::ShellSubsystem),
    spec("gitlab_shell.service", Kind::Map, Constraint::Fields { fields: SHELL_SERVICE_FIELDS }, Subsystem::ShellService),
    // Process supervisor hardening
    spec("runit.svlogd_bin", Kind::String, Constraint::AbsolutePath, Subsystem::ProcessSupervisor),
    spec("runit.chpst_bin", Kind::String, Constraint::AbsolutePath, Subsystem::ProcessSupervisor),
    // SSH daemon
    SettingSpec {
        note: Some(SSHD_OVERLAP),
        ..toggle("openssh.enable", Subsystem::SecureShell)
    },
    SettingSpec {
        note: Some(SSHD_OVERLAP),
        ..toggle("service.sshd", Subsystem::SecureShell)
    },
    // Storage
    toggle("gitaly.persistence", Subsystem::Storage),
    spec("gitaly.storage_class", Kind::String, Constraint::ResourceName, Subsystem::Storage),
    spec("gitaly.security_context", Kind::Map, SECURITY_CONTEXT, Subsystem::Storage),
    // Cache
    toggle("redis.enable", Subsystem::Cache),
    toggle("redis.master.enable", Subsystem::Cache),
    toggle("redis.replica.enable", Subsystem::Cache),
    // Database
    toggle("postgresql.enable", Subsystem::Database),
    spec("gitlab_rails.db_adapter", Kind::String, Constraint::OneOf { values: &["postgresql"] }, Subsystem::Database),
    spec("gitlab_rails.db_host", Kind::String, Constraint::NonEmpty, Subsystem::Database),
    spec("gitlab_rails.db_port", Kind::Integer, PORT, Subsystem::Database),
    spec("gitlab_rails.db_username", Kind::String, Constraint::NonEmpty, Subsystem::Database),
    SettingSpec {
        sensitive: true,
        ..spec("gitlab_rails.db_password", Kind::String, Constraint::None, Subsystem::Database)
    },
    spec("gitlab_rails.db_database", Kind::String, Constraint::NonEmpty, Subsystem::Database),
    // Metrics and registry
    toggle("prometheus.enable", Subsystem::Metrics),
    toggle("registry.enable", Subsystem::Registry),
];

/// Schema entry for an exact dotted key.
pub fn lookup(key: &str) -> Option<&'static SettingSpec> {
    SCHEMA.iter().find(|spec| spec.key == key)
}

/// True when `key` is a namespace containing known keys (`redis`, `redis.master`).
pub fn is_namespace(key: &str) -> bool {
    SCHEMA
        .iter()
        .any(|spec| spec.key.len() > key.len() && spec.key.starts_with(key) && spec.key.as_bytes()[key.len()] == b'.')
}

/// True when the value of `key` must not be displayed.
pub fn is_sensitive(key: &str) -> bool {
    lookup(key).is_some_and(|spec| spec.sensitive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_are_unique_and_not_nested() {
        let mut seen = HashSet::new();
        for spec in SCHEMA {
            assert!(seen.insert(spec.key), "duplicate schema key {}", spec.key);
            assert!(
                !is_namespace(spec.key),
                "{} is both a key and a namespace",
                spec.key
            );
        }
    }

    #[test]
    fn test_namespaces() {
        assert!(is_namespace("redis"));
        assert!(is_namespace("redis.master"));
        assert!(!is_namespace("redis.enable"));
        assert!(!is_namespace("red"));
        assert!(!is_namespace("gitlab_rails.db"));
    }

    #[test]
    fn test_constraints_match_kinds() {
        for spec in SCHEMA {
            match spec.constraint {
                Constraint::Range { .. } => assert_eq!(spec.kind, Kind::Integer, "{}", spec.key),
                Constraint::Fields { .. } => assert_eq!(spec.kind, Kind::Map, "{}", spec.key),
                Constraint::None => {}
                _ => assert_eq!(spec.kind, Kind::String, "{}", spec.key),
            }
        }
    }

    #[test]
    fn test_sensitive_keys() {
        assert!(is_sensitive("gitlab_rails.db_password"));
        assert!(!is_sensitive("gitlab_rails.db_username"));
    }

    #[test]
    fn test_sshd_overlap_is_annotated() {
        assert!(lookup("openssh.enable").unwrap().note.is_some());
        assert!(lookup("service.sshd").unwrap().note.is_some());
    }
}
