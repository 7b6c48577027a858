//! Common error types for ResearchTwin

use thiserror::Error;

/// Common result type for ResearchTwin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the core library and its front-ends
///
/// Upstream source failures are deliberately absent: those degrade to
/// "no data" inside the core and never surface as an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller-supplied input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Cache backend failure
    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
