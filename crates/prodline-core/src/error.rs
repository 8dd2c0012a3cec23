//! Error types for prodline-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid flow direction: {0}")]
    InvalidDirection(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
