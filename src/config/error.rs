//! Errors raised while loading, saving or validating a map configuration.

use std::path::PathBuf;

/// Why a configuration file could not be used
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// Reading or writing the TOML file failed
    #[error("config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML, or a value of the wrong type
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration could not be written back as TOML
    #[error("cannot serialise config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Values parsed but out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
