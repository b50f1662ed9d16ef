//! Error types for isocrate

use thiserror::Error;

/// Main error type for isocrate operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias for isocrate operations
pub type Result<T> = std::result::Result<T, Error>;
