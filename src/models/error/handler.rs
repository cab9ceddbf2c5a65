use serde::Serialize;
use thiserror::Error;

use super::{NonceManagerError, ProviderError, StoreError};

/// Errors surfaced by the relayer operation handler. Classification happens
/// once, at the submission boundary; the handler decides retry-vs-fail per
/// variant and never re-classifies further up.
#[derive(Error, Debug, Clone, Serialize)]
pub enum HandlerError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Nonce conflict: {0}")]
    NonceConflict(String),
    #[error("Transient submission error: {0}")]
    Transient(String),
    #[error("Operation not found: {0}")]
    NotFound(String),
    #[error("Operation store error: {0}")]
    Store(#[from] StoreError),
    #[error("Nonce manager error: {0}")]
    Nonce(#[from] NonceManagerError),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Handler error: {0}")]
    Other(String),
}

/// Classifies a submission failure. Transport-level transients stay
/// retryable; nonce-class node responses get the one-shot nonce refresh;
/// everything else fails the attempt.
pub fn classify_submission_error(err: ProviderError) -> HandlerError {
    if err.is_retriable() {
        return HandlerError::Transient(err.to_string());
    }
    let msg = err.to_string().to_lowercase();
    if msg.contains("nonce too low")
        || msg.contains("invalid nonce")
        || msg.contains("replacement transaction underpriced")
        || msg.contains("already known")
    {
        HandlerError::NonceConflict(err.to_string())
    } else {
        HandlerError::Other(err.to_string())
    }
}
