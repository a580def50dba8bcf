//! Check results and their rendering.

use std::fmt::Write;
use std::path::Path;

use serde::Serialize;

use crate::descriptor::{load_file, LoadError, Settings};
use crate::validation::{advisories, validate_with, Advisory, ValidationError, ValidationOptions};

/// Outcome of checking one descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub path: String,
    pub keys: usize,
    pub violations: Vec<Located<ValidationError>>,
    pub advisories: Vec<Advisory>,
}

/// A finding with the source line of the statement it comes from.
#[derive(Debug, Clone, Serialize)]
pub struct Located<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(flatten)]
    pub item: T,
}

impl Report {
    /// Validate already loaded settings.
    pub fn check(path: &Path, settings: &Settings, options: &ValidationOptions) -> Self {
        let violations = validate_with(settings, options)
            .err()
            .unwrap_or_default()
            .into_iter()
            .map(|error| Located {
                line: settings.line_of(&error.field),
                item: error,
            })
            .collect();

        Self {
            path: path.display().to_string(),
            keys: settings.len(),
            violations,
            advisories: advisories(settings),
        }
    }

    /// Load `path` and check it.
    pub fn check_file(path: &Path, options: &ValidationOptions) -> Result<(Settings, Self), LoadError> {
        let settings = load_file(path)?;
        let report = Self::check(path, &settings, options);
        Ok((settings, report))
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Valid, and with no advisories when `strict`.
    pub fn passes(&self, strict: bool) -> bool {
        self.is_valid() && !(strict && !self.advisories.is_empty())
    }

    /// Human-readable rendering.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for violation in &self.violations {
            match violation.line {
                Some(line) => {
                    let _ = writeln!(out, "{}:{}: error: {}", self.path, line, violation.item);
                }
                None => {
                    let _ = writeln!(out, "{}: error: {}", self.path, violation.item);
                }
            }
        }
        for advisory in &self.advisories {
            let _ = writeln!(out, "{}: advisory: {}", self.path, advisory);
        }
        let _ = writeln!(
            out,
            "{}: {} key(s), {} error(s), {} advisory(ies)",
            self.path,
            self.keys,
            self.violations.len(),
            self.advisories.len()
        );
        out
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
