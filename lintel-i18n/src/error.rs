//! Error types for translation loading

use lintel_config::ConfigError;
use thiserror::Error;

/// Errors that can occur while loading translations.
#[derive(Debug, Error)]
pub enum I18nError {
    /// Message id without a `namespace:` part
    #[error("Invalid message id: {0}")]
    InvalidId(String),

    /// No folder was added for the namespace
    #[error("Unknown translation namespace: {0}")]
    UnknownNamespace(String),

    /// Failed to read or parse a message file
    #[error("Failed to load message file: {0}")]
    Load(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<I18nError> for lintel_core::Error {
    fn from(err: I18nError) -> Self {
        match err {
            I18nError::Load(err) => lintel_core::Error::Config(err),
            I18nError::IoError(err) => lintel_core::Error::Io(err),
            other => lintel_core::Error::Internal(other.to_string()),
        }
    }
}
