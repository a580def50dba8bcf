//! Tool configuration schema.
//!
//! Settings for the `omnibus-config` tool itself, not for the descriptor it
//! checks. All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

use crate::validation::ValidationOptions;

/// Root configuration for the tool.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ToolConfig {
    /// Logging settings.
    pub logging: LoggingConfig,

    /// Validation policy.
    pub validation: ValidationConfig,

    /// Watch mode settings.
    pub watch: WatchConfig,

    /// Rendering of descriptor values.
    pub output: OutputConfig,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Validation policy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Accept keys the schema does not know.
    pub allow_unknown_keys: bool,

    /// Treat advisories as failures.
    pub fail_on_advisories: bool,
}

impl ValidationConfig {
    pub fn options(&self) -> ValidationOptions {
        ValidationOptions {
            allow_unknown_keys: self.allow_unknown_keys,
        }
    }
}

/// Watch mode configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Poll interval for backends without native change events, in seconds.
    pub poll_interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Hide sensitive values (database password) in rendered output.
    pub redact_secrets: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            redact_secrets: true,
        }
    }
}
