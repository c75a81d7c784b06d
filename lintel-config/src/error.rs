// Configuration errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key not found: {0}")]
    KeyNotFound(String),

    #[error("Unsupported configuration file: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {format} configuration: {message}")]
    Syntax { format: &'static str, message: String },

    #[error("Value of `{key}` can't be stored: {message}")]
    Serialization { key: String, message: String },

    #[error("Value of `{key}` has the wrong type: {message}")]
    Deserialization { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
