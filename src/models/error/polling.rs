use serde::Serialize;
use thiserror::Error;

use super::{HandlerError, StoreError};

#[derive(Error, Debug, Clone, Serialize)]
pub enum PollingError {
    #[error("Polling timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
    #[error("Polling cancelled")]
    Cancelled,
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    #[error("Operation not found: {0}")]
    NotFound(String),
    #[error("Status fetch failed: {0}")]
    Fetch(String),
    #[error("Operation store error: {0}")]
    Store(#[from] StoreError),
}

impl From<HandlerError> for PollingError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::NotFound(id) => PollingError::NotFound(id),
            HandlerError::Store(e) => PollingError::Store(e),
            other => PollingError::Fetch(other.to_string()),
        }
    }
}
