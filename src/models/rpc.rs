use serde::{Deserialize, Serialize};

use crate::models::ProviderError;

/// RPC endpoint configuration for a single chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub chain_id: u64,
}

impl RpcConfig {
    pub fn new(url: impl Into<String>, chain_id: u64) -> Result<Self, ProviderError> {
        let url = url.into();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ProviderError::NetworkConfiguration(format!(
                "RPC url must be http(s): {}",
                url
            )));
        }
        Ok(Self { url, chain_id })
    }
}
