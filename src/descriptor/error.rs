//! Descriptor loading errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning descriptor text into [`Settings`](super::Settings).
///
/// Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}, column {column}: expected {expected}, found {found}")]
    Unexpected {
        line: usize,
        column: usize,
        expected: String,
        found: String,
    },

    #[error("line {line}, column {column}: invalid literal: {message}")]
    InvalidLiteral {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("line {line}, column {column}: unterminated string literal")]
    UnterminatedString { line: usize, column: usize },

    #[error("line {line}, column {column}: unterminated block opened here")]
    UnterminatedBlock { line: usize, column: usize },

    #[error("line {line}: invalid key `{key}`: {reason}")]
    InvalidKey {
        key: String,
        line: usize,
        reason: String,
    },

    #[error("line {line}: duplicate key `{key}` (first assigned on line {first_line})")]
    DuplicateKey {
        key: String,
        line: usize,
        first_line: usize,
    },

    #[error("line {line}: key `{key}` overlaps `{existing}` assigned on line {existing_line}")]
    ConflictingKey {
        key: String,
        existing: String,
        line: usize,
        existing_line: usize,
    },
}

/// Errors raised by [`SettingsBuilder`](super::SettingsBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("duplicate key `{key}`")]
    Duplicate { key: String, first_line: Option<usize> },

    #[error("key `{key}` overlaps `{existing}`")]
    Conflict {
        key: String,
        existing: String,
        existing_line: Option<usize>,
    },

    #[error("{reason}")]
    InvalidKey { key: String, reason: String },
}

impl SettingsError {
    /// Attach the source line of the offending statement.
    pub(crate) fn at_line(self, line: usize) -> ParseError {
        match self {
            SettingsError::Duplicate { key, first_line } => ParseError::DuplicateKey {
                key,
                line,
                first_line: first_line.unwrap_or(line),
            },
            SettingsError::Conflict {
                key,
                existing,
                existing_line,
            } => ParseError::ConflictingKey {
                key,
                existing,
                line,
                existing_line: existing_line.unwrap_or(line),
            },
            SettingsError::InvalidKey { key, reason } => ParseError::InvalidKey { key, line, reason },
        }
    }
}

/// Errors raised by [`load_file`](super::load_file).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}
