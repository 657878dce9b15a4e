//! Error types shared by sharkbase crates

use thiserror::Error;

/// Result type alias for sharkbase operations
pub type Result<T> = std::result::Result<T, SharkbaseError>;

/// Main error type for sharkbase
#[derive(Error, Debug)]
pub enum SharkbaseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SharkbaseError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
