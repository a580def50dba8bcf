//! Typed view of a descriptor.
//!
//! The flat [`Settings`] value is converted through its nested JSON tree into
//! plain structs, so callers can work with fields instead of dotted keys.
//! Absent keys take the platform's defaults. Convert only validated
//! settings; the conversion itself does not report schema violations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::Settings;

/// Error converting settings into the typed view.
#[derive(Debug, Error)]
#[error("settings do not match the deployment model: {0}")]
pub struct DeploymentError(#[from] serde_json::Error);

/// Root of the typed view.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Deployment {
    /// Public URL of the platform.
    pub external_url: Option<String>,
    pub nginx: NginxConfig,
    pub gitlab_rails: RailsConfig,
    pub gitlab_shell: ShellConfig,
    pub runit: RunitConfig,
    pub openssh: Toggle,
    pub service: ServiceConfig,
    pub gitaly: GitalyConfig,
    pub redis: RedisConfig,
    pub postgresql: Toggle,
    pub prometheus: Toggle,
    pub registry: Toggle,
}

impl Default for Deployment {
    fn default() -> Self {
        Self {
            external_url: None,
            nginx: NginxConfig::default(),
            gitlab_rails: RailsConfig::default(),
            gitlab_shell: ShellConfig::default(),
            runit: RunitConfig::default(),
            openssh: Toggle::OFF,
            service: ServiceConfig::default(),
            gitaly: GitalyConfig::default(),
            redis: RedisConfig::default(),
            postgresql: Toggle::ON,
            prometheus: Toggle::ON,
            registry: Toggle::OFF,
        }
    }
}

/// A subsystem with only an `enable` flag.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Toggle {
    pub enable: bool,
}

impl Toggle {
    pub const ON: Toggle = Toggle { enable: true };
    pub const OFF: Toggle = Toggle { enable: false };
}

/// Bundled proxy / web server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NginxConfig {
    pub enable: bool,
    pub redirect_http_to_https: bool,
    pub listen_https: Option<bool>,
}

impl Default for NginxConfig {
    fn default() -> Self {
        Self {
            enable: true,
            redirect_http_to_https: false,
            listen_https: None,
        }
    }
}

/// Container security context.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContext {
    pub run_as_user: u32,
    pub run_as_group: u32,
    pub fs_group: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_non_root: Option<bool>,
}

/// Web service settings, including the external database connection.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RailsConfig {
    pub webservice_external_port: Option<u16>,
    pub gitlab_shell_ssh_port: Option<u16>,
    pub gitlab_shell_ssh_path: Option<String>,
    pub ssh_host_rsa_key: Option<String>,
    pub ssh_host_dss_key: Option<String>,
    pub ssh_host_ecdsa_key: Option<String>,
    pub ssh_host_ed25519_key: Option<String>,
    pub security_context: Option<SecurityContext>,
    pub db_adapter: Option<String>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_username: Option<String>,
    pub db_password: Option<String>,
    pub db_database: Option<String>,
}

/// Shell subsystem.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    pub enable: bool,
    pub service: Option<ShellService>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            enable: true,
            service: None,
        }
    }
}

/// Shell service block.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShellService {
    pub security_context: SecurityContext,
}

/// Process supervisor binary overrides.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RunitConfig {
    pub svlogd_bin: Option<String>,
    pub chpst_bin: Option<String>,
}

/// Service-level switches.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub sshd: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { sshd: true }
    }
}

/// Repository storage backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GitalyConfig {
    pub persistence: bool,
    pub storage_class: Option<String>,
    pub security_context: Option<SecurityContext>,
}

/// Cache.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RedisConfig {
    pub enable: bool,
    pub master: Toggle,
    pub replica: Toggle,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enable: true,
            master: Toggle::ON,
            replica: Toggle::OFF,
        }
    }
}

/// Connection parameters for a database outside the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalDatabase {
    pub adapter: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

/// Where the platform's database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatabaseTarget {
    /// The bundled engine.
    Internal,
    /// An external server with every connection parameter set.
    External(ExternalDatabase),
    /// Internal engine disabled but the external connection is incomplete.
    Unconfigured,
}

impl Deployment {
    /// Build the typed view from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, DeploymentError> {
        Ok(serde_json::from_value(settings.to_json())?)
    }

    pub fn database(&self) -> DatabaseTarget {
        if self.postgresql.enable {
            return DatabaseTarget::Internal;
        }
        let rails = &self.gitlab_rails;
        match (
            &rails.db_adapter,
            &rails.db_host,
            rails.db_port,
            &rails.db_username,
            &rails.db_password,
            &rails.db_database,
        ) {
            (Some(adapter), Some(host), Some(port), Some(username), Some(password), Some(database)) => {
                DatabaseTarget::External(ExternalDatabase {
                    adapter: adapter.clone(),
                    host: host.clone(),
                    port,
                    username: username.clone(),
                    password: password.clone(),
                    database: database.clone(),
                })
            }
            _ => DatabaseTarget::Unconfigured,
        }
    }

    /// True when either SSH daemon gate is on.
    pub fn sshd_enabled(&self) -> bool {
        self.openssh.enable || self.service.sshd
    }

    /// Every declared security context, labelled by its key.
    pub fn security_contexts(&self) -> Vec<(&'static str, SecurityContext)> {
        let mut contexts = Vec::new();
        if let Some(ctx) = self.gitlab_rails.security_context {
            contexts.push(("gitlab_rails.security_context", ctx));
        }
        if let Some(ctx) = self.gitaly.security_context {
            contexts.push(("gitaly.security_context", ctx));
        }
        if let Some(service) = self.gitlab_shell.service {
            contexts.push(("gitlab_shell.service.securityContext", service.security_context));
        }
        contexts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::load;

    #[test]
    fn test_defaults_when_absent() {
        let deployment = Deployment::from_settings(&load("").unwrap()).unwrap();
        assert!(deployment.nginx.enable);
        assert!(deployment.gitlab_shell.enable);
        assert!(deployment.postgresql.enable);
        assert!(deployment.redis.master.enable);
        assert!(!deployment.redis.replica.enable);
        assert!(!deployment.registry.enable);
        assert_eq!(deployment.database(), DatabaseTarget::Internal);
    }

    #[test]
    fn test_unconfigured_external_database() {
        let settings = load("postgresql['enable'] = false\ngitlab_rails['db_host'] = 'db'").unwrap();
        let deployment = Deployment::from_settings(&settings).unwrap();
        assert_eq!(deployment.database(), DatabaseTarget::Unconfigured);
    }

    #[test]
    fn test_security_contexts_collected() {
        let settings = load(
            "gitaly['security_context'] = { 'runAsUser' => 1000, 'runAsGroup' => 1000, 'fsGroup' => 1000 }\n\
             gitlab_shell['service'] = { 'securityContext' => { 'runAsUser' => 1, 'runAsGroup' => 2, 'fsGroup' => 3 } }\n",
        )
        .unwrap();
        let deployment = Deployment::from_settings(&settings).unwrap();
        let contexts = deployment.security_contexts();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[1].0, "gitlab_shell.service.securityContext");
        assert_eq!(contexts[1].1.fs_group, 3);
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let settings = load("gitlab_rails['db_port'] = 'five'").unwrap();
        assert!(Deployment::from_settings(&settings).is_err());
    }
}
