use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by an effect sink. None of these stop a tick; the runtime
/// logs them and moves on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SinkError {
    #[error("handle {0} is no longer valid")]
    HandleExpired(crate::Handle),

    #[error("unknown effect key '{0}'")]
    UnknownKey(String),

    #[error("sink rejected operation: {0}")]
    Rejected(String),
}

/// Loading settings or timeline files from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
