//! Schema validation of loaded settings.
//!
//! # Responsibilities
//! - Check every key against [`SCHEMA`](super::schema::SCHEMA): kind, range, format
//! - Check structured mappings (security contexts) for required and unknown fields
//! - Report unknown keys unless the caller opts into forward-compatible keys
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function of the settings and options
//! - Violations are ordered by key so repeated runs are identical

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::descriptor::{Kind, Settings, Value};
use crate::validation::schema::{self, Constraint, FieldSpec};

/// Validation policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Accept keys the schema does not know.
    pub allow_unknown_keys: bool,
}

/// One offending key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Dotted key of the offending setting.
    pub field: String,
    pub reason: Violation,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// Why a setting was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Violation {
    UnknownKey,
    WrongType { expected: Kind, found: Kind },
    OutOfRange { value: i64, min: i64, max: i64 },
    MissingField { name: String },
    InvalidUrl { message: String },
    NotAbsolutePath,
    Empty,
    InvalidName { message: String },
    NotAllowed { value: String, allowed: Vec<String> },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::UnknownKey => f.write_str("unknown key"),
            Violation::WrongType { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            Violation::OutOfRange { value, min, max } => {
                write!(f, "value {} out of range [{}, {}]", value, min, max)
            }
            Violation::MissingField { name } => write!(f, "missing required field `{}`", name),
            Violation::InvalidUrl { message } => write!(f, "invalid URL: {}", message),
            Violation::NotAbsolutePath => f.write_str("expected an absolute path"),
            Violation::Empty => f.write_str("must not be empty"),
            Violation::InvalidName { message } => write!(f, "invalid name: {}", message),
            Violation::NotAllowed { value, allowed } => {
                write!(f, "`{}` is not one of: {}", value, allowed.join(", "))
            }
        }
    }
}

/// Validate with the default (strict) policy.
pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    validate_with(settings, &ValidationOptions::default())
}

/// Validate `settings`, collecting every violation.
pub fn validate_with(
    settings: &Settings,
    options: &ValidationOptions,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    walk(&settings.tree(), "", options, &mut errors);

    if errors.is_empty() {
        tracing::debug!(keys = settings.len(), "Descriptor valid");
        Ok(())
    } else {
        tracing::debug!(violations = errors.len(), "Descriptor invalid");
        Err(errors)
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn walk(
    node: &BTreeMap<String, Value>,
    prefix: &str,
    options: &ValidationOptions,
    errors: &mut Vec<ValidationError>,
) {
    for (name, value) in node {
        let key = join(prefix, name);
        if let Some(spec) = schema::lookup(&key) {
            check(&key, value, spec.kind, &spec.constraint, options, errors);
        } else if schema::is_namespace(&key) {
            match value {
                Value::Map(children) => walk(children, &key, options, errors),
                other => errors.push(ValidationError {
                    field: key,
                    reason: Violation::WrongType {
                        expected: Kind::Map,
                        found: other.kind(),
                    },
                }),
            }
        } else if !options.allow_unknown_keys {
            errors.push(ValidationError {
                field: key,
                reason: Violation::UnknownKey,
            });
        }
    }
}

fn check(
    key: &str,
    value: &Value,
    kind: Kind,
    constraint: &Constraint,
    options: &ValidationOptions,
    errors: &mut Vec<ValidationError>,
) {
    let mut fail = |reason| {
        errors.push(ValidationError {
            field: key.to_string(),
            reason,
        })
    };

    if value.kind() != kind {
        fail(Violation::WrongType {
            expected: kind,
            found: value.kind(),
        });
        return;
    }

    match (constraint, value) {
        (Constraint::None, _) => {}
        (Constraint::Range { min, max }, Value::Integer(i)) => {
            if i < min || i > max {
                fail(Violation::OutOfRange {
                    value: *i,
                    min: *min,
                    max: *max,
                });
            }
        }
        (Constraint::HttpUrl, Value::String(s)) => {
            if let Err(message) = check_http_url(s) {
                fail(Violation::InvalidUrl { message });
            }
        }
        (Constraint::AbsolutePath, Value::String(s)) => {
            if !s.starts_with('/') {
                fail(Violation::NotAbsolutePath);
            }
        }
        (Constraint::NonEmpty, Value::String(s)) => {
            if s.trim().is_empty() {
                fail(Violation::Empty);
            }
        }
        (Constraint::ResourceName, Value::String(s)) => {
            if let Err(message) = check_resource_name(s) {
                fail(Violation::InvalidName { message });
            }
        }
        (Constraint::OneOf { values }, Value::String(s)) => {
            if !values.contains(&s.as_str()) {
                fail(Violation::NotAllowed {
                    value: s.clone(),
                    allowed: values.iter().map(|v| v.to_string()).collect(),
                });
            }
        }
        (Constraint::Fields { fields }, Value::Map(map)) => {
            check_fields(key, map, fields, options, errors);
        }
        // Kind already matched; remaining pairs are schema mistakes caught
        // by the schema tests.
        _ => {}
    }
}

fn check_fields(
    key: &str,
    map: &BTreeMap<String, Value>,
    fields: &[FieldSpec],
    options: &ValidationOptions,
    errors: &mut Vec<ValidationError>,
) {
    for field in fields {
        match map.get(field.name) {
            Some(value) => check(
                &join(key, field.name),
                value,
                field.kind,
                &field.constraint,
                options,
                errors,
            ),
            None if field.required => errors.push(ValidationError {
                field: key.to_string(),
                reason: Violation::MissingField {
                    name: field.name.to_string(),
                },
            }),
            None => {}
        }
    }
    if !options.allow_unknown_keys {
        for name in map.keys() {
            if !fields.iter().any(|field| field.name == name.as_str()) {
                errors.push(ValidationError {
                    field: join(key, name),
                    reason: Violation::UnknownKey,
                });
            }
        }
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme `{}`", other)),
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err("missing host".into());
    }
    Ok(())
}

/// DNS-1123 subdomain: lowercase alphanumerics, `-` and `.`, at most 253
/// characters, starting and ending with an alphanumeric.
fn check_resource_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("must not be empty".into());
    }
    if name.len() > 253 {
        return Err("longer than 253 characters".into());
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
    {
        return Err(format!("character `{}` not allowed", c));
    }
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return Err("must start and end with an alphanumeric character".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::load;

    fn errors_for(source: &str) -> Vec<ValidationError> {
        validate(&load(source).unwrap()).err().unwrap_or_default()
    }

    #[test]
    fn test_port_bounds() {
        assert!(errors_for("gitlab_rails['db_port'] = 0").is_empty());
        assert!(errors_for("gitlab_rails['db_port'] = 65535").is_empty());

        let errors = errors_for("gitlab_rails['db_port'] = 65536");
        assert_eq!(
            errors,
            vec![ValidationError {
                field: "gitlab_rails.db_port".into(),
                reason: Violation::OutOfRange {
                    value: 65536,
                    min: 0,
                    max: 65535
                },
            }]
        );
        assert!(matches!(
            errors_for("gitlab_rails['gitlab_shell_ssh_port'] = -1")[0].reason,
            Violation::OutOfRange { value: -1, .. }
        ));
    }

    #[test]
    fn test_wrong_type() {
        let errors = errors_for("nginx['enable'] = 'yes'");
        assert_eq!(
            errors[0].reason,
            Violation::WrongType {
                expected: Kind::Bool,
                found: Kind::String
            }
        );
    }

    #[test]
    fn test_scalar_in_namespace_position() {
        let errors = errors_for("redis['master'] = true");
        assert_eq!(errors[0].field, "redis.master");
        assert!(matches!(errors[0].reason, Violation::WrongType { expected: Kind::Map, .. }));
    }

    #[test]
    fn test_unknown_keys_policy() {
        let settings = load("nginx['worker_processes'] = 4\ngitaly['security_context'] = { 'runAsUser' => 1, 'runAsGroup' => 1, 'fsGroup' => 1, 'seLinux' => 'x' }").unwrap();
        let errors = validate(&settings).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["gitaly.security_context.seLinux", "nginx.worker_processes"]);

        let lenient = ValidationOptions {
            allow_unknown_keys: true,
        };
        assert!(validate_with(&settings, &lenient).is_ok());
    }

    #[test]
    fn test_security_context_fields() {
        let errors = errors_for("gitaly['security_context'] = { 'runAsGroup' => 1000, 'fsGroup' => -5 }");
        assert!(errors.contains(&ValidationError {
            field: "gitaly.security_context".into(),
            reason: Violation::MissingField {
                name: "runAsUser".into()
            },
        }));
        assert!(errors
            .iter()
            .any(|e| e.field == "gitaly.security_context.fsGroup"
                && matches!(e.reason, Violation::OutOfRange { .. })));
    }

    #[test]
    fn test_string_formats() {
        assert!(matches!(
            errors_for("external_url 'ftp://gitlab'")[0].reason,
            Violation::InvalidUrl { .. }
        ));
        assert!(matches!(
            errors_for("external_url 'not a url'")[0].reason,
            Violation::InvalidUrl { .. }
        ));
        assert_eq!(
            errors_for("runit['chpst_bin'] = 'bin/false'")[0].reason,
            Violation::NotAbsolutePath
        );
        assert_eq!(errors_for("gitlab_rails['db_host'] = '  '")[0].reason, Violation::Empty);
        assert!(matches!(
            errors_for("gitlab_rails['db_adapter'] = 'mysql2'")[0].reason,
            Violation::NotAllowed { .. }
        ));
    }

    #[test]
    fn test_resource_names() {
        assert!(check_resource_name("standard").is_ok());
        assert!(check_resource_name("gp3.encrypted-1").is_ok());
        assert!(check_resource_name("Standard").is_err());
        assert!(check_resource_name("-fast").is_err());
        assert!(check_resource_name("fast_ssd").is_err());
    }
}
