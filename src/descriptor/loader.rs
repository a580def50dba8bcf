//! Descriptor loading from text and from disk.

use std::fs;
use std::path::Path;

use crate::descriptor::error::{LoadError, ParseError};
use crate::descriptor::parser::parse;
use crate::descriptor::settings::Settings;

/// Parse descriptor text.
pub fn load(source: &str) -> Result<Settings, ParseError> {
    let settings = parse(source)?;
    tracing::debug!(keys = settings.len(), "Descriptor parsed");
    Ok(settings)
}

/// Read and parse a descriptor file.
pub fn load_file(path: &Path) -> Result<Settings, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = load(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), keys = settings.len(), "Descriptor loaded");
    Ok(settings)
}
