//! Nonce assignment for shared signing accounts.
//!
//! Assigns strictly increasing, collision-free nonces per
//! `(address, chain_id)`. Assignment serializes through a short-lived lease
//! on the atomic store, so two concurrent callers never observe the same
//! pre-lock state, even across processes. The assigned value is
//! `max(chain pending count, last assigned + 1)`: at least what the chain
//! currently reports, and never a repeat of anything we handed out.
//!
//! `reset_nonce` discards local state so the next assignment resyncs from
//! the chain; `burn_nonce` replaces a stuck transaction with an overpriced
//! zero-value self-transfer at the same nonce to free the queue.

use std::sync::Arc;

use alloy::network::TransactionBuilder;
use alloy::primitives::U256;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::time::{sleep, Duration, Instant};

#[cfg(test)]
use mockall::automock;

use crate::constants::{
    BURN_TX_GAS_LIMIT, DEFAULT_BURN_GAS_MULTIPLIER, NONCE_LOCK_ACQUIRE_BUDGET_MS,
    NONCE_LOCK_RETRY_DELAY_MS, NONCE_LOCK_TTL_MS,
};
use crate::models::NonceManagerError;
use crate::repositories::AtomicStoreTrait;
use crate::services::provider::{BlockTag, EvmProviderTrait};

#[async_trait]
#[cfg_attr(test, automock)]
pub trait NonceManagerTrait: Send + Sync {
    /// Assigns the next collision-free nonce for the address.
    async fn assign_nonce(&self, address: &str, chain_id: u64) -> Result<u64, NonceManagerError>;

    /// Discards the tracked state so the next assignment resyncs from the
    /// chain's pending count.
    async fn reset_nonce(&self, address: &str, chain_id: u64) -> Result<(), NonceManagerError>;

    /// Aligns the tracked state with the chain's current pending count and
    /// returns that count.
    async fn sync_nonce(&self, address: &str, chain_id: u64) -> Result<u64, NonceManagerError>;

    /// Replaces whatever sits at `nonce` with an overpriced zero-value
    /// self-transfer. Operator-driven recovery; failure is surfaced, never
    /// silently retried.
    async fn burn_nonce(
        &self,
        nonce: u64,
        address: &str,
        chain_id: u64,
        gas_multiplier: Option<f64>,
    ) -> Result<String, NonceManagerError>;

    /// Last value handed out for the address, `None` if nothing was assigned
    /// since the last reset. Read without the lock; staleness is tolerable.
    async fn last_assigned(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Option<i64>, NonceManagerError>;
}

pub struct NonceManager<A: AtomicStoreTrait, P: EvmProviderTrait> {
    store: Arc<A>,
    provider: Arc<P>,
}

impl<A: AtomicStoreTrait, P: EvmProviderTrait> NonceManager<A, P> {
    pub fn new(store: Arc<A>, provider: Arc<P>) -> Self {
        Self { store, provider }
    }

    fn nonce_key(address: &str, chain_id: u64) -> String {
        format!("nonce_last_assigned:{}:{}", chain_id, address.to_lowercase())
    }

    fn lock_key(address: &str, chain_id: u64) -> String {
        format!("nonce_lock:{}:{}", chain_id, address.to_lowercase())
    }

    /// Retries acquisition every `NONCE_LOCK_RETRY_DELAY_MS` until the
    /// budget runs out, then surfaces contention as a retryable error.
    async fn acquire_nonce_lock(&self, lock_key: &str) -> Result<String, NonceManagerError> {
        let deadline = Instant::now() + Duration::from_millis(NONCE_LOCK_ACQUIRE_BUDGET_MS);

        loop {
            if let Some(token) = self.store.acquire_lock(lock_key, NONCE_LOCK_TTL_MS).await? {
                return Ok(token);
            }
            if Instant::now() >= deadline {
                return Err(NonceManagerError::LockContention(format!(
                    "Could not acquire {} within {}ms",
                    lock_key, NONCE_LOCK_ACQUIRE_BUDGET_MS
                )));
            }
            sleep(Duration::from_millis(NONCE_LOCK_RETRY_DELAY_MS)).await;
        }
    }

    async fn read_last_assigned(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Option<i64>, NonceManagerError> {
        let value = self.store.get(&Self::nonce_key(address, chain_id)).await?;
        match value {
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|e| {
                    NonceManagerError::InvalidState(format!(
                        "Stored nonce for {} is not an integer: {}",
                        address, e
                    ))
                }),
            None => Ok(None),
        }
    }

    async fn assign_under_lock(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<u64, NonceManagerError> {
        let pending = self
            .provider
            .get_transaction_count(address, BlockTag::Pending)
            .await?;
        let last_assigned = self.read_last_assigned(address, chain_id).await?.unwrap_or(-1);

        let next = (pending as i64).max(last_assigned + 1) as u64;

        self.store
            .set(&Self::nonce_key(address, chain_id), &next.to_string())
            .await?;

        debug!(
            "Assigned nonce {} for {} on chain {} (pending={}, last_assigned={})",
            next, address, chain_id, pending, last_assigned
        );
        Ok(next)
    }
}

#[async_trait]
impl<A: AtomicStoreTrait, P: EvmProviderTrait> NonceManagerTrait for NonceManager<A, P> {
    async fn assign_nonce(&self, address: &str, chain_id: u64) -> Result<u64, NonceManagerError> {
        let lock_key = Self::lock_key(address, chain_id);
        let token = self.acquire_nonce_lock(&lock_key).await?;

        let result = self.assign_under_lock(address, chain_id).await;

        if let Err(e) = self.store.release_lock(&lock_key, &token).await {
            // The lease expires on its own; log and keep the assignment result.
            warn!("Failed to release nonce lock {}: {}", lock_key, e);
        }

        result
    }

    async fn reset_nonce(&self, address: &str, chain_id: u64) -> Result<(), NonceManagerError> {
        self.store.delete(&Self::nonce_key(address, chain_id)).await?;
        info!("Reset nonce state for {} on chain {}", address, chain_id);
        Ok(())
    }

    async fn sync_nonce(&self, address: &str, chain_id: u64) -> Result<u64, NonceManagerError> {
        let lock_key = Self::lock_key(address, chain_id);
        let token = self.acquire_nonce_lock(&lock_key).await?;

        let result = async {
            let pending = self
                .provider
                .get_transaction_count(address, BlockTag::Pending)
                .await?;
            self.store
                .set(
                    &Self::nonce_key(address, chain_id),
                    &(pending as i64 - 1).to_string(),
                )
                .await?;
            info!(
                "Synced nonce state for {} on chain {} to pending count {}",
                address, chain_id, pending
            );
            Ok(pending)
        }
        .await;

        if let Err(e) = self.store.release_lock(&lock_key, &token).await {
            warn!("Failed to release nonce lock {}: {}", lock_key, e);
        }

        result
    }

    async fn burn_nonce(
        &self,
        nonce: u64,
        address: &str,
        chain_id: u64,
        gas_multiplier: Option<f64>,
    ) -> Result<String, NonceManagerError> {
        let multiplier = gas_multiplier.unwrap_or(DEFAULT_BURN_GAS_MULTIPLIER);
        let parsed_address = address
            .parse::<alloy::primitives::Address>()
            .map_err(|e| NonceManagerError::InvalidState(format!("Invalid address: {}", e)))?;

        let estimate = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(|e| NonceManagerError::BurnFailed {
                nonce,
                reason: format!("Fee estimation failed: {}", e),
            })?;

        let max_fee = (estimate.max_fee_per_gas as f64 * multiplier) as u128;
        let max_priority = (estimate.max_priority_fee_per_gas as f64 * multiplier) as u128;

        let tx = TransactionRequest::default()
            .with_from(parsed_address)
            .with_to(parsed_address)
            .with_value(U256::ZERO)
            .with_nonce(nonce)
            .with_chain_id(chain_id)
            .with_gas_limit(BURN_TX_GAS_LIMIT)
            .with_max_fee_per_gas(max_fee)
            .with_max_priority_fee_per_gas(max_priority);

        let hash = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| NonceManagerError::BurnFailed {
                nonce,
                reason: e.to_string(),
            })?;

        info!(
            "Burned nonce {} for {} on chain {} with tx {} (multiplier {})",
            nonce, address, chain_id, hash, multiplier
        );
        Ok(hash)
    }

    async fn last_assigned(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Option<i64>, NonceManagerError> {
        self.read_last_assigned(address, chain_id).await
    }
}
