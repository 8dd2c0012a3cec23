//! Store error types.

use prodline_core::{ConnectionId, MachineId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Machine not found: {0}")]
    MachineNotFound(MachineId),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the error refers to an absent entity.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MachineNotFound(_) | Self::ConnectionNotFound(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
