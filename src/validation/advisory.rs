//! Cross-setting advisories.
//!
//! # Responsibilities
//! - Point out settings that are inert because their subsystem is disabled
//! - Point out toggles that disagree with each other
//! - Point out an external database connection that is incomplete
//!
//! # Design Decisions
//! - Advisories never fail validation on their own; the CLI can opt into that
//! - Each advisory names every key it is about
//! - Absent toggles are read with the platform's own defaults

use std::fmt;

use serde::Serialize;

use crate::descriptor::Settings;

/// A non-fatal finding about how settings relate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub keys: Vec<String>,
    pub message: String,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.keys.join(", "), self.message)
    }
}

const EXTERNAL_DB_KEYS: &[&str] = &[
    "gitlab_rails.db_adapter",
    "gitlab_rails.db_host",
    "gitlab_rails.db_port",
    "gitlab_rails.db_username",
    "gitlab_rails.db_password",
    "gitlab_rails.db_database",
];

/// Collect advisories for `settings`.
pub fn advisories(settings: &Settings) -> Vec<Advisory> {
    let mut found = Vec::new();
    let mut advise = |keys: &[&str], message: String| {
        found.push(Advisory {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            message,
        })
    };

    // The SSH daemon has two gates; neither is authoritative.
    if let (Some(openssh), Some(sshd)) = (
        settings.get_bool("openssh.enable"),
        settings.get_bool("service.sshd"),
    ) {
        if openssh != sshd {
            advise(
                &["openssh.enable", "service.sshd"],
                format!(
                    "SSH daemon gates disagree (openssh.enable = {}, service.sshd = {})",
                    openssh, sshd
                ),
            );
        }
    }

    if settings.get_bool("gitlab_shell.enable") == Some(false) {
        let port = settings.get_integer("gitlab_rails.gitlab_shell_ssh_port");
        if port.is_some_and(|p| p != 0) {
            advise(
                &["gitlab_shell.enable", "gitlab_rails.gitlab_shell_ssh_port"],
                "shell subsystem is disabled; the shell SSH port is inert".into(),
            );
        }
    }

    let internal_db = settings.get_bool("postgresql.enable").unwrap_or(true);
    if internal_db {
        if settings.contains("gitlab_rails.db_host") {
            advise(
                &["postgresql.enable", "gitlab_rails.db_host"],
                "internal database engine is enabled while an external host is set".into(),
            );
        }
    } else {
        let missing: Vec<&str> = EXTERNAL_DB_KEYS
            .iter()
            .copied()
            .filter(|key| !settings.contains(key))
            .collect();
        if !missing.is_empty() {
            let mut keys = vec!["postgresql.enable"];
            keys.extend(&missing);
            advise(
                &keys,
                format!(
                    "internal database engine is disabled but the external connection is missing {}",
                    missing.join(", ")
                ),
            );
        }
    }

    let listen_https = settings.get_bool("nginx.listen_https");
    if settings.get_bool("nginx.redirect_http_to_https") == Some(true) && listen_https == Some(false) {
        advise(
            &["nginx.redirect_http_to_https", "nginx.listen_https"],
            "redirecting to HTTPS while the proxy does not listen on HTTPS".into(),
        );
    }
    if let Some(external) = settings.get_str("external_url") {
        if external.starts_with("https://") && listen_https == Some(false) {
            advise(
                &["external_url", "nginx.listen_https"],
                "external URL is HTTPS but the proxy does not listen on HTTPS; TLS must terminate upstream".into(),
            );
        }
    }

    if settings.get_bool("redis.enable") == Some(false) {
        for key in ["redis.master.enable", "redis.replica.enable"] {
            if settings.get_bool(key) == Some(true) {
                advise(
                    &["redis.enable", key],
                    format!("cache is disabled; `{}` is inert", key),
                );
            }
        }
    } else if settings.get_bool("redis.replica.enable") == Some(true)
        && settings.get_bool("redis.master.enable") == Some(false)
    {
        advise(
            &["redis.master.enable", "redis.replica.enable"],
            "cache replica is enabled without a primary".into(),
        );
    }

    if settings.get_bool("gitaly.persistence") == Some(false) && settings.contains("gitaly.storage_class") {
        advise(
            &["gitaly.persistence", "gitaly.storage_class"],
            "persistence is disabled; the storage class is inert".into(),
        );
    }

    for advisory in &found {
        tracing::debug!(keys = ?advisory.keys, "{}", advisory.message);
    }
    found
}
