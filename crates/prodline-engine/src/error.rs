//! Engine error types.

use prodline_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Whether the error refers to an absent entity.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store(e) => e.is_not_found(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
