//! Loading settings and timeline files from explicit paths.

use std::path::Path;

use tandem_types::Settings;

use crate::dsl::{self, ParseOptions, ParseOutput};
use crate::error::ConfigError;

/// Read a TOML settings file. Missing fields take their defaults.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Settings {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and parse a timeline file.
///
/// Only I/O fails; malformed content becomes parse warnings.
pub fn load_book(path: &Path, options: &ParseOptions<'_>) -> Result<ParseOutput, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "Loaded timeline file");
    Ok(dsl::parse(&text, options))
}
