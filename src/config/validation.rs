//! Tool configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (poll interval > 0, known log level)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ToolConfig → Result<(), Vec<ConfigValidationError>>

use std::fmt;

use crate::config::schema::ToolConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A rejected tool configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a deserialized configuration.
pub fn validate_config(config: &ToolConfig) -> Result<(), Vec<ConfigValidationError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError {
            field: "logging.level",
            message: format!(
                "unknown level `{}`, expected one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.watch.poll_interval_secs == 0 {
        errors.push(ConfigValidationError {
            field: "watch.poll_interval_secs",
            message: "must be greater than 0".into(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ToolConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ToolConfig::default();
        config.logging.level = "loud".into();
        config.watch.poll_interval_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["logging.level", "watch.poll_interval_secs"]);
    }

    #[test]
    fn test_level_is_case_insensitive() {
        let mut config = ToolConfig::default();
        config.logging.level = "DEBUG".into();
        assert!(validate_config(&config).is_ok());
    }
}
