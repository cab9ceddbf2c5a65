use serde::Serialize;
use thiserror::Error;

use super::{ProviderError, StoreError};

#[derive(Error, Debug, Clone, Serialize)]
pub enum NonceManagerError {
    #[error("Nonce lock contention: {0}")]
    LockContention(String),
    #[error("Nonce assignment timed out: {0}")]
    Timeout(String),
    #[error("Underlying store error: {0}")]
    Store(#[from] StoreError),
    #[error("Underlying provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Failed to burn nonce {nonce}: {reason}")]
    BurnFailed { nonce: u64, reason: String },
    #[error("Invalid nonce state: {0}")]
    InvalidState(String),
}

impl NonceManagerError {
    /// Contention is the only variant a caller should back off and retry on.
    pub fn is_retriable(&self) -> bool {
        matches!(self, NonceManagerError::LockContention(_))
    }
}
