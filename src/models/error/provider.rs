use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize)]
pub enum ProviderError {
    #[error("RPC request timed out")]
    Timeout,
    #[error("RPC rate limited")]
    RateLimited,
    #[error("RPC bad gateway")]
    BadGateway,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Network configuration error: {0}")]
    NetworkConfiguration(String),
    #[error("RPC request error: {0}")]
    RequestError(String),
    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Transient errors that a bounded retry may resolve.
    pub fn is_retriable(&self) -> bool {
        match self {
            ProviderError::Timeout | ProviderError::RateLimited | ProviderError::BadGateway => true,
            other => {
                let msg = other.to_string().to_lowercase();
                msg.contains("timeout") || msg.contains("connection") || msg.contains("reset")
            }
        }
    }
}

impl From<alloy::transports::TransportError> for ProviderError {
    fn from(err: alloy::transports::TransportError) -> Self {
        let msg = err.to_string();
        let lowered = msg.to_lowercase();
        if lowered.contains("timed out") || lowered.contains("timeout") {
            ProviderError::Timeout
        } else if lowered.contains("429") || lowered.contains("too many requests") {
            ProviderError::RateLimited
        } else if lowered.contains("502") || lowered.contains("bad gateway") {
            ProviderError::BadGateway
        } else {
            ProviderError::RequestError(msg)
        }
    }
}

impl From<String> for ProviderError {
    fn from(msg: String) -> Self {
        ProviderError::Other(msg)
    }
}
