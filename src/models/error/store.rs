use serde::Serialize;
use thiserror::Error;

/// Errors raised at the store boundary. Redis and in-memory implementations
/// classify their native failures into these variants; callers never see a
/// raw driver error.
#[derive(Error, Debug, Clone, Serialize)]
pub enum StoreError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Failed to connect to the store: {0}")]
    ConnectionError(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("An unknown store error occurred: {0}")]
    Other(String),
}
