//! Relayer operation handler.
//!
//! Single entry point that turns a relay request into either an immediate
//! result or a trackable async operation. Two modes:
//!
//! - **Stateless** (no operation store): assign a nonce, submit, classify
//!   the immediate outcome. A nonce-class failure gets exactly one retry
//!   with a freshly fetched nonce; nothing else is retried.
//! - **Stateful** (operation store configured): persist the request as
//!   `queued`, drive a bounded queued/processing retry loop for transient
//!   failures, mark `submitted` on success and hand the caller a pending
//!   operation id. Idempotent per operation id: a replayed request returns
//!   the recorded outcome and never double-submits.
//!
//! Error classification happens once, at the submission boundary; the
//! lifecycle decisions here never re-classify.

use std::sync::Arc;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::time::{sleep, Duration};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::constants::{DEFAULT_OPERATION_MAX_RETRIES, OPERATION_RETRY_DELAY_MS};
use crate::models::{
    classify_submission_error, HandlerError, OperationRecord, OperationStatus, PollingError,
    RelayRequest, RelayerResponse,
};
use crate::repositories::OperationStoreTrait;
use crate::services::nonce_manager::NonceManagerTrait;
use crate::services::polling::StatusFetcher;
use crate::services::provider::EvmProviderTrait;
use crate::utils::time::now_millis;

/// Surface the API layer talks to, so routes can be tested against mocks.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait RelayApi: Send + Sync {
    async fn relay(&self, request: RelayRequest) -> Result<RelayerResponse, HandlerError>;

    async fn operation_status(&self, operation_id: &str)
        -> Result<OperationRecord, HandlerError>;
}

pub struct RelayerOperationHandler<N, P, S>
where
    N: NonceManagerTrait,
    P: EvmProviderTrait,
    S: OperationStoreTrait,
{
    nonce_manager: Arc<N>,
    provider: Arc<P>,
    operation_store: Option<Arc<S>>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl<N, P, S> RelayerOperationHandler<N, P, S>
where
    N: NonceManagerTrait,
    P: EvmProviderTrait,
    S: OperationStoreTrait,
{
    pub fn new(nonce_manager: Arc<N>, provider: Arc<P>, operation_store: Option<Arc<S>>) -> Self {
        Self {
            nonce_manager,
            provider,
            operation_store,
            max_retries: DEFAULT_OPERATION_MAX_RETRIES,
            retry_delay_ms: OPERATION_RETRY_DELAY_MS,
        }
    }

    pub fn with_retry_policy(mut self, max_retries: u32, retry_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    async fn build_transaction(
        &self,
        request: &RelayRequest,
        nonce: u64,
    ) -> Result<TransactionRequest, HandlerError> {
        let from = request
            .address
            .parse::<Address>()
            .map_err(|e| HandlerError::Validation(format!("Invalid sender address: {}", e)))?;

        let mut tx = TransactionRequest::default()
            .with_from(from)
            .with_chain_id(request.chain_id)
            .with_nonce(nonce);

        if let Some(to) = &request.to {
            let to = to
                .parse::<Address>()
                .map_err(|e| HandlerError::Validation(format!("Invalid destination: {}", e)))?;
            tx = tx.with_to(to);
        }
        if let Some(value) = request.value {
            tx = tx.with_value(U256::from(value));
        }
        if let Some(data) = &request.data {
            let data = data
                .parse::<Bytes>()
                .map_err(|e| HandlerError::Validation(format!("Invalid calldata: {}", e)))?;
            tx = tx.with_input(data);
        }

        // Fee overrides win; anything missing comes from the network estimate.
        match (request.max_fee_per_gas, request.max_priority_fee_per_gas) {
            (Some(max_fee), Some(priority)) => {
                tx = tx.with_max_fee_per_gas(max_fee);
                tx = tx.with_max_priority_fee_per_gas(priority);
            }
            (max_fee, priority) => {
                let estimate = self
                    .provider
                    .estimate_eip1559_fees()
                    .await
                    .map_err(classify_submission_error)?;
                tx = tx.with_max_fee_per_gas(max_fee.unwrap_or(estimate.max_fee_per_gas));
                tx = tx.with_max_priority_fee_per_gas(
                    priority.unwrap_or(estimate.max_priority_fee_per_gas),
                );
            }
        }

        Ok(tx)
    }

    async fn relay_stateless(
        &self,
        request: &RelayRequest,
    ) -> Result<RelayerResponse, HandlerError> {
        let assigned = request.nonce.is_none();
        let nonce = match request.nonce {
            Some(nonce) => nonce,
            None => {
                self.nonce_manager
                    .assign_nonce(&request.address, request.chain_id)
                    .await?
            }
        };

        let tx = self.build_transaction(request, nonce).await?;
        let first_failure = match self.provider.send_transaction(tx).await {
            Ok(hash) => {
                return Ok(RelayerResponse::Direct {
                    transaction_hash: hash,
                    nonce,
                })
            }
            Err(e) => classify_submission_error(e),
        };

        match first_failure {
            // Exactly one retry with a freshly fetched nonce, and only when
            // the conflicting nonce was ours to begin with.
            HandlerError::NonceConflict(msg) if assigned => {
                warn!(
                    "Nonce conflict for {} ({}), retrying once with a fresh nonce",
                    request.address, msg
                );
                // Assignment re-reads the chain's pending count, which moves
                // past the conflict without discarding the stored high-water
                // mark.
                let fresh = self
                    .nonce_manager
                    .assign_nonce(&request.address, request.chain_id)
                    .await?;
                let tx = self.build_transaction(request, fresh).await?;
                match self.provider.send_transaction(tx).await {
                    Ok(hash) => Ok(RelayerResponse::Direct {
                        transaction_hash: hash,
                        nonce: fresh,
                    }),
                    Err(e) => {
                        let classified = classify_submission_error(e);
                        Ok(RelayerResponse::Error {
                            operation_id: None,
                            message: classified.to_string(),
                            retriable: matches!(classified, HandlerError::Transient(_)),
                        })
                    }
                }
            }
            HandlerError::Transient(msg) => Ok(RelayerResponse::Error {
                operation_id: None,
                message: msg,
                retriable: true,
            }),
            other => Ok(RelayerResponse::Error {
                operation_id: None,
                message: other.to_string(),
                retriable: false,
            }),
        }
    }

    /// Maps an existing record to the response a replayed submission gets.
    async fn replay_response(&self, record: OperationRecord) -> RelayerResponse {
        match record.status {
            OperationStatus::Queued | OperationStatus::Processing => RelayerResponse::Pending {
                operation_id: record.id,
            },
            OperationStatus::Submitted => RelayerResponse::Submitted {
                operation_id: record.id,
                transaction_hash: record.transaction_hash.unwrap_or_default(),
                nonce: record.nonce.unwrap_or_default(),
            },
            OperationStatus::Confirmed => {
                let hash = record.transaction_hash.clone().unwrap_or_default();
                let block_number = match self.provider.get_transaction_receipt(&hash).await {
                    Ok(Some(receipt)) => receipt.block_number,
                    _ => 0,
                };
                RelayerResponse::Confirmed {
                    operation_id: record.id,
                    transaction_hash: hash,
                    nonce: record.nonce.unwrap_or_default(),
                    block_number,
                }
            }
            OperationStatus::Failed => RelayerResponse::Error {
                operation_id: Some(record.id),
                message: record
                    .error
                    .unwrap_or_else(|| "Operation failed".to_string()),
                retriable: false,
            },
        }
    }

    async fn fail_record(
        &self,
        store: &Arc<S>,
        record: &mut OperationRecord,
        message: String,
    ) -> Result<(), HandlerError> {
        record.status = OperationStatus::Failed;
        record.error = Some(message);
        record.updated_at = now_millis();
        store.set(record.clone()).await?;
        Ok(())
    }

    /// Requeues the record after a transient failure, or fails it when the
    /// retry budget is spent. Returns the terminal response on exhaustion.
    async fn requeue_or_fail(
        &self,
        store: &Arc<S>,
        record: &mut OperationRecord,
        message: String,
    ) -> Result<Option<RelayerResponse>, HandlerError> {
        record.retry_count += 1;
        if record.retry_count > self.max_retries {
            self.fail_record(store, record, message.clone()).await?;
            return Ok(Some(RelayerResponse::Error {
                operation_id: Some(record.id.clone()),
                message,
                retriable: false,
            }));
        }
        record.status = OperationStatus::Queued;
        record.error = Some(message);
        record.updated_at = now_millis();
        store.set(record.clone()).await?;
        sleep(Duration::from_millis(self.retry_delay_ms)).await;
        Ok(None)
    }

    async fn relay_stateful(
        &self,
        store: &Arc<S>,
        request: RelayRequest,
    ) -> Result<RelayerResponse, HandlerError> {
        let operation_id = request
            .operation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Some(existing) = store.get(&operation_id).await? {
            debug!("Replaying operation {} at {:?}", operation_id, existing.status);
            return Ok(self.replay_response(existing).await);
        }

        let mut record = OperationRecord::new(&operation_id, request.clone());
        store.set(record.clone()).await?;

        let explicit_nonce = request.nonce.is_some();
        let mut assigned_nonce = request.nonce;
        let mut nonce_refreshed = false;

        loop {
            record.status = OperationStatus::Processing;
            record.updated_at = now_millis();
            store.set(record.clone()).await?;

            // One nonce per operation: transient requeues reuse the value so
            // an attempt that never reached the network burns nothing.
            let nonce = match assigned_nonce {
                Some(nonce) => nonce,
                None => {
                    match self
                        .nonce_manager
                        .assign_nonce(&record.request.address, record.request.chain_id)
                        .await
                    {
                        Ok(nonce) => {
                            assigned_nonce = Some(nonce);
                            nonce
                        }
                        Err(e) if e.is_retriable() => {
                            match self
                                .requeue_or_fail(store, &mut record, e.to_string())
                                .await?
                            {
                                Some(terminal) => return Ok(terminal),
                                None => continue,
                            }
                        }
                        Err(e) => {
                            self.fail_record(store, &mut record, e.to_string()).await?;
                            return Ok(RelayerResponse::Error {
                                operation_id: Some(operation_id),
                                message: e.to_string(),
                                retriable: false,
                            });
                        }
                    }
                }
            };

            // Build failures get the same treatment as submission failures:
            // a transient fee-estimation error must not strand the record in
            // `processing`.
            let tx = match self.build_transaction(&record.request, nonce).await {
                Ok(tx) => tx,
                Err(HandlerError::Transient(msg)) => {
                    warn!(
                        "Transient build failure for operation {} (attempt {}): {}",
                        operation_id,
                        record.retry_count + 1,
                        msg
                    );
                    match self.requeue_or_fail(store, &mut record, msg).await? {
                        Some(terminal) => return Ok(terminal),
                        None => continue,
                    }
                }
                Err(other) => {
                    self.fail_record(store, &mut record, other.to_string()).await?;
                    return Ok(RelayerResponse::Error {
                        operation_id: Some(operation_id),
                        message: other.to_string(),
                        retriable: false,
                    });
                }
            };
            match self.provider.send_transaction(tx).await {
                Ok(hash) => {
                    record.status = OperationStatus::Submitted;
                    record.transaction_hash = Some(hash);
                    record.nonce = Some(nonce);
                    record.error = None;
                    record.updated_at = now_millis();
                    store.set(record.clone()).await?;
                    info!(
                        "Operation {} submitted with nonce {} after {} retries",
                        operation_id, nonce, record.retry_count
                    );
                    return Ok(RelayerResponse::Pending { operation_id });
                }
                Err(e) => match classify_submission_error(e) {
                    HandlerError::Transient(msg) => {
                        warn!(
                            "Transient failure for operation {} (attempt {}): {}",
                            operation_id,
                            record.retry_count + 1,
                            msg
                        );
                        if let Some(terminal) =
                            self.requeue_or_fail(store, &mut record, msg).await?
                        {
                            return Ok(terminal);
                        }
                    }
                    HandlerError::NonceConflict(msg) => {
                        if nonce_refreshed || explicit_nonce {
                            self.fail_record(store, &mut record, msg.clone()).await?;
                            return Ok(RelayerResponse::Error {
                                operation_id: Some(operation_id),
                                message: msg,
                                retriable: false,
                            });
                        }
                        warn!(
                            "Nonce conflict for operation {} ({}), refreshing once",
                            operation_id, msg
                        );
                        nonce_refreshed = true;
                        // The next loop iteration assigns against a re-read
                        // pending count.
                        assigned_nonce = None;
                        record.status = OperationStatus::Queued;
                        record.error = Some(msg);
                        record.updated_at = now_millis();
                        store.set(record.clone()).await?;
                    }
                    other => {
                        self.fail_record(store, &mut record, other.to_string()).await?;
                        return Ok(RelayerResponse::Error {
                            operation_id: Some(operation_id),
                            message: other.to_string(),
                            retriable: false,
                        });
                    }
                },
            }
        }
    }

    /// Builds the status callback PollingManager consumes.
    pub fn status_fetcher(self: &Arc<Self>) -> StatusFetcher
    where
        N: 'static,
        P: 'static,
        S: 'static,
    {
        let handler = Arc::clone(self);
        Arc::new(move |operation_id: String| {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                handler
                    .operation_status(&operation_id)
                    .await
                    .map_err(PollingError::from)
            })
        })
    }
}

#[async_trait]
impl<N, P, S> RelayApi for RelayerOperationHandler<N, P, S>
where
    N: NonceManagerTrait,
    P: EvmProviderTrait,
    S: OperationStoreTrait,
{
    async fn relay(&self, request: RelayRequest) -> Result<RelayerResponse, HandlerError> {
        request.validate()?;

        match &self.operation_store {
            Some(store) => self.relay_stateful(&store.clone(), request).await,
            None => self.relay_stateless(&request).await,
        }
    }

    /// Fetches the current record, advancing `Submitted` operations whose
    /// receipt has landed to `Confirmed` or `Failed`.
    async fn operation_status(
        &self,
        operation_id: &str,
    ) -> Result<OperationRecord, HandlerError> {
        let store = self.operation_store.as_ref().ok_or_else(|| {
            HandlerError::Validation("Operation tracking is not configured".to_string())
        })?;

        let mut record = store
            .get(operation_id)
            .await?
            .ok_or_else(|| HandlerError::NotFound(operation_id.to_string()))?;

        if record.status == OperationStatus::Submitted {
            if let Some(hash) = record.transaction_hash.clone() {
                match self.provider.get_transaction_receipt(&hash).await {
                    Ok(Some(receipt)) => {
                        record.status = if receipt.success {
                            OperationStatus::Confirmed
                        } else {
                            record.error = Some("Transaction reverted".to_string());
                            OperationStatus::Failed
                        };
                        record.updated_at = now_millis();
                        store.set(record.clone()).await?;
                    }
                    Ok(None) => {}
                    // Receipt lookups are best-effort; the next poll retries.
                    Err(e) => debug!("Receipt lookup for {} failed: {}", operation_id, e),
                }
            }
        }

        Ok(record)
    }
}
