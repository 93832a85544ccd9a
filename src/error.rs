//! Error types for the cadenza engine

use std::io;
use thiserror::Error;

/// Engine error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed buffer or out-of-range parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No execution path can honour the request
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// A collaborator (stem separation, harmony extraction, notation) failed
    #[error("External capability '{capability}' failed: {message}")]
    ExternalCapabilityFailure { capability: String, message: String },

    /// The accelerated execution context could not be started.
    ///
    /// Only produced while an [`Engine`](crate::Engine) is being built; the engine
    /// recovers by falling back to the direct strategy.
    #[error("Strategy initialization failed: {0}")]
    StrategyInitializationFailure(String),

    /// Container could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Container could not be written
    #[error("Encode error: {0}")]
    Encode(String),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub(crate) fn capability(
        capability: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Error::ExternalCapabilityFailure {
            capability: capability.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

// Library errors are flattened to strings at the boundary

impl From<symphonia::core::errors::Error> for Error {
    fn from(e: symphonia::core::errors::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => Error::Io(io),
            other => Error::Encode(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let capability = if e.is_timeout() { "http (timeout)" } else { "http" };
        Error::capability(capability, e)
    }
}
