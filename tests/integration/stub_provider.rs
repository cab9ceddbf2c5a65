//! A deterministic in-process chain used by the integration tests.
//!
//! Broadcast transactions are recorded, receipts always succeed, and the
//! pending/latest transaction counts are plain atomics the tests can move.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use relayer_coordinator::models::{ProviderError, TransactionReceiptData};
use relayer_coordinator::services::provider::{BlockTag, EvmProviderTrait, FeeEstimate};

pub struct StubProvider {
    pub pending_count: AtomicU64,
    pub latest_count: AtomicU64,
    pub sent: Mutex<Vec<TransactionRequest>>,
}

impl StubProvider {
    pub fn new(pending_count: u64, latest_count: u64) -> Self {
        Self {
            pending_count: AtomicU64::new(pending_count),
            latest_count: AtomicU64::new(latest_count),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent_nonces(&self) -> Vec<u64> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|tx| tx.nonce)
            .collect()
    }
}

#[async_trait]
impl EvmProviderTrait for StubProvider {
    async fn get_block_number(&self) -> Result<u64, ProviderError> {
        Ok(1_000)
    }

    async fn get_transaction_count(
        &self,
        _address: &str,
        tag: BlockTag,
    ) -> Result<u64, ProviderError> {
        let count = match tag {
            BlockTag::Pending => self.pending_count.load(Ordering::SeqCst),
            BlockTag::Latest => self.latest_count.load(Ordering::SeqCst),
        };
        Ok(count)
    }

    async fn estimate_eip1559_fees(&self) -> Result<FeeEstimate, ProviderError> {
        Ok(FeeEstimate {
            max_fee_per_gas: 30_000_000_000,
            max_priority_fee_per_gas: 2_000_000_000,
        })
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<String, ProviderError> {
        let nonce = tx.nonce.unwrap_or_default();
        self.sent.lock().unwrap().push(tx);
        self.pending_count.fetch_add(1, Ordering::SeqCst);
        Ok(format!("0xhash{:04x}", nonce))
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceiptData>, ProviderError> {
        Ok(Some(TransactionReceiptData {
            transaction_hash: tx_hash.to_string(),
            block_number: 1_001,
            success: true,
            logs: Vec::new(),
        }))
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
