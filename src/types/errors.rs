//! Application error types.
//!
//! The bridge callbacks and the bus never fail on their own; these errors
//! cover configuration loading and the wiring done by the binary.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the event bridge.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or unparsable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Kubernetes client or watcher errors.
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<envconfig::Error> for Error {
    fn from(err: envconfig::Error) -> Self {
        Self::Config(err.to_string())
    }
}
