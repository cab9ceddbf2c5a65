//! EVM Provider for interacting with EVM-compatible blockchain networks.
//!
//! This module wraps an HTTP RPC provider behind [`EvmProviderTrait`] so the
//! nonce manager, handler and health checker can be tested against mocks.
//! All calls go through the bounded retry loop in [`retry`].

pub mod retry;

pub use retry::{calculate_retry_delay, retry_rpc_call, RetryConfig};

use std::time::Duration;

use alloy::{
    primitives::U64,
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::{client::ClientBuilder, types::TransactionRequest},
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use reqwest::ClientBuilder as ReqwestClientBuilder;

#[cfg(test)]
use mockall::automock;

use crate::models::{ProviderError, ReceiptLog, RpcConfig, TransactionReceiptData};

/// Which view of the chain a transaction count query reflects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    /// Includes transactions the node has accepted but not yet mined.
    Pending,
    /// Mined transactions only.
    Latest,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTag::Pending => "pending",
            BlockTag::Latest => "latest",
        }
    }
}

/// EIP-1559 fee estimate returned by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Trait defining the interface for EVM blockchain interactions.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait EvmProviderTrait: Send + Sync {
    /// Gets the current block number of the chain.
    async fn get_block_number(&self) -> Result<u64, ProviderError>;

    /// Gets the transaction count (nonce) for an address at the given tag.
    async fn get_transaction_count(
        &self,
        address: &str,
        tag: BlockTag,
    ) -> Result<u64, ProviderError>;

    /// Estimates EIP-1559 fee parameters from the network.
    async fn estimate_eip1559_fees(&self) -> Result<FeeEstimate, ProviderError>;

    /// Sends a transaction to the network, returning its hash.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<String, ProviderError>;

    /// Gets a transaction receipt by its hash, `None` while unmined.
    async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceiptData>, ProviderError>;

    /// Performs a health check by attempting to get the latest block number.
    async fn health_check(&self) -> Result<bool, ProviderError>;
}

/// Provider implementation for EVM-compatible blockchain networks.
#[derive(Clone)]
pub struct EvmProvider {
    rpc: RpcConfig,
    /// Timeout in seconds for new HTTP clients
    timeout_seconds: u64,
    retry_config: RetryConfig,
}

impl EvmProvider {
    pub fn new(rpc: RpcConfig, timeout_seconds: u64) -> Result<Self, ProviderError> {
        let retry_config = RetryConfig::from_env();
        Ok(Self {
            rpc,
            timeout_seconds,
            retry_config,
        })
    }

    fn initialize_provider(&self) -> Result<RootProvider<Http<Client>>, ProviderError> {
        let rpc_url = self.rpc.url.parse().map_err(|e| {
            ProviderError::NetworkConfiguration(format!("Invalid URL format: {}", e))
        })?;

        let client = ReqwestClientBuilder::default()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Other(format!("Failed to build HTTP client: {}", e)))?;

        let mut transport = Http::new(rpc_url);
        transport.set_client(client);

        let is_local = transport.guess_local();
        let client = ClientBuilder::default().transport(transport, is_local);

        Ok(ProviderBuilder::new().on_client(client))
    }

    /// Helper method to retry RPC calls with exponential backoff
    async fn retry_rpc_call<T, F, Fut>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> Result<T, ProviderError>
    where
        F: Fn(RootProvider<Http<Client>>) -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let provider = self.initialize_provider()?;

        retry_rpc_call(
            operation_name,
            ProviderError::is_retriable,
            || operation(provider.clone()),
            Some(self.retry_config.clone()),
        )
        .await
    }
}

impl AsRef<EvmProvider> for EvmProvider {
    fn as_ref(&self) -> &EvmProvider {
        self
    }
}

fn receipt_from_alloy(receipt: alloy::rpc::types::TransactionReceipt) -> TransactionReceiptData {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| ReceiptLog {
            address: log.address().to_string(),
            topics: log.topics().iter().map(|t| t.to_string()).collect(),
            data: log.data().data.to_string(),
        })
        .collect();

    TransactionReceiptData {
        transaction_hash: receipt.transaction_hash.to_string(),
        block_number: receipt.block_number.unwrap_or_default(),
        success: receipt.status(),
        logs,
    }
}

#[async_trait]
impl EvmProviderTrait for EvmProvider {
    async fn get_block_number(&self) -> Result<u64, ProviderError> {
        self.retry_rpc_call("get_block_number", |provider| async move {
            provider
                .get_block_number()
                .await
                .map_err(ProviderError::from)
        })
        .await
    }

    async fn get_transaction_count(
        &self,
        address: &str,
        tag: BlockTag,
    ) -> Result<u64, ProviderError> {
        let parsed_address = address
            .parse::<alloy::primitives::Address>()
            .map_err(|e| ProviderError::InvalidAddress(e.to_string()))?;

        let count: U64 = self
            .retry_rpc_call("get_transaction_count", move |provider| async move {
                provider
                    .raw_request(
                        "eth_getTransactionCount".into(),
                        (parsed_address, tag.as_str()),
                    )
                    .await
                    .map_err(ProviderError::from)
            })
            .await?;

        Ok(count.to::<u64>())
    }

    async fn estimate_eip1559_fees(&self) -> Result<FeeEstimate, ProviderError> {
        let estimate = self
            .retry_rpc_call("estimate_eip1559_fees", |provider| async move {
                provider
                    .estimate_eip1559_fees(None)
                    .await
                    .map_err(ProviderError::from)
            })
            .await?;

        Ok(FeeEstimate {
            max_fee_per_gas: estimate.max_fee_per_gas,
            max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
        })
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<String, ProviderError> {
        // The hash is extracted inside the closure; the pending-transaction
        // builder borrows the provider and cannot outlive it.
        self.retry_rpc_call("send_transaction", move |provider| {
            let tx_req = tx.clone();
            async move {
                let pending_tx = provider
                    .send_transaction(tx_req)
                    .await
                    .map_err(ProviderError::from)?;
                Ok(pending_tx.tx_hash().to_string())
            }
        })
        .await
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceiptData>, ProviderError> {
        let parsed_tx_hash = tx_hash
            .parse::<alloy::primitives::TxHash>()
            .map_err(|e| ProviderError::InvalidAddress(e.to_string()))?;

        let receipt = self
            .retry_rpc_call("get_transaction_receipt", move |provider| async move {
                provider
                    .get_transaction_receipt(parsed_tx_hash)
                    .await
                    .map_err(ProviderError::from)
            })
            .await?;

        Ok(receipt.map(receipt_from_alloy))
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        match self.get_block_number().await {
            Ok(_) => Ok(true),
            Err(e) => Err(e),
        }
    }
}
