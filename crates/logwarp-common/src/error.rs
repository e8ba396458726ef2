//! Error types for Logwarp

use thiserror::Error;

/// Result type alias for Logwarp operations
pub type Result<T> = std::result::Result<T, LogwarpError>;

/// Main error type shared across Logwarp crates
#[derive(Error, Debug)]
pub enum LogwarpError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
