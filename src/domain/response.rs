//! Waitable handle over a relay response.
//!
//! Wraps the tagged response union so callers can block until finality
//! without matching on variants themselves. `confirmed` and `direct`
//! resolve with an opportunistic receipt lookup, `submitted` fetches the
//! receipt (extracting expected events when a transaction context is
//! attached), `pending` delegates to the polling loop, and `error` rejects
//! immediately.

use std::sync::Arc;

use log::debug;

use crate::models::{
    PollingError, ReceiptLog, RelayerResponse, TransactionContext, TransactionReceiptData,
};
use crate::services::polling::{PollingManager, PollingOptions};
use crate::services::provider::EvmProviderTrait;

/// Terminal result of waiting on a relay response.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOutcome {
    pub transaction_hash: String,
    pub receipt: Option<TransactionReceiptData>,
    /// Logs whose first topic matches an expected event signature.
    pub events: Vec<ReceiptLog>,
}

pub struct ResponseHandle<P: EvmProviderTrait> {
    response: RelayerResponse,
    provider: Arc<P>,
    polling: Option<PollingManager>,
    context: Option<TransactionContext>,
}

impl<P: EvmProviderTrait> ResponseHandle<P> {
    pub fn new(response: RelayerResponse, provider: Arc<P>) -> Self {
        Self {
            response,
            provider,
            polling: None,
            context: None,
        }
    }

    pub fn with_polling(mut self, polling: PollingManager) -> Self {
        self.polling = Some(polling);
        self
    }

    pub fn with_context(mut self, context: TransactionContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn status(&self) -> &RelayerResponse {
        &self.response
    }

    /// Whether `wait` can make progress. `error` never resolves and
    /// `pending` needs a polling loop attached.
    pub fn can_wait(&self) -> bool {
        match &self.response {
            RelayerResponse::Error { .. } => false,
            RelayerResponse::Pending { .. } => self.polling.is_some(),
            _ => true,
        }
    }

    pub async fn wait(&self, options: PollingOptions) -> Result<WaitOutcome, PollingError> {
        match &self.response {
            RelayerResponse::Confirmed {
                transaction_hash, ..
            }
            | RelayerResponse::Direct {
                transaction_hash, ..
            } => {
                let receipt = self.try_fetch_receipt(transaction_hash).await;
                Ok(self.outcome(transaction_hash.clone(), receipt))
            }
            RelayerResponse::Submitted {
                transaction_hash, ..
            } => {
                let receipt = self
                    .provider
                    .get_transaction_receipt(transaction_hash)
                    .await
                    .map_err(|e| PollingError::Fetch(e.to_string()))?;
                Ok(self.outcome(transaction_hash.clone(), receipt))
            }
            RelayerResponse::Pending { operation_id } => {
                let polling = self.polling.as_ref().ok_or_else(|| {
                    PollingError::Fetch("No polling loop attached to a pending response".to_string())
                })?;
                let record = polling.start_polling(operation_id, options).await?;
                let transaction_hash = record.transaction_hash.ok_or_else(|| {
                    PollingError::Fetch(format!(
                        "Confirmed operation {} has no transaction hash",
                        operation_id
                    ))
                })?;
                let receipt = self.try_fetch_receipt(&transaction_hash).await;
                Ok(self.outcome(transaction_hash, receipt))
            }
            RelayerResponse::Error {
                operation_id,
                message,
                ..
            } => {
                debug!("Wait on failed response {:?}: {}", operation_id, message);
                Err(PollingError::OperationFailed(message.clone()))
            }
        }
    }

    async fn try_fetch_receipt(&self, transaction_hash: &str) -> Option<TransactionReceiptData> {
        match self.provider.get_transaction_receipt(transaction_hash).await {
            Ok(receipt) => receipt,
            Err(e) => {
                debug!("Receipt lookup for {} failed: {}", transaction_hash, e);
                None
            }
        }
    }

    fn outcome(
        &self,
        transaction_hash: String,
        receipt: Option<TransactionReceiptData>,
    ) -> WaitOutcome {
        let events = match (&receipt, &self.context) {
            (Some(receipt), Some(context)) => extract_expected_events(receipt, context),
            _ => Vec::new(),
        };
        WaitOutcome {
            transaction_hash,
            receipt,
            events,
        }
    }
}

/// Filters receipt logs down to those whose event signature (topic zero)
/// appears in the context's expected set. Comparison is case-insensitive.
fn extract_expected_events(
    receipt: &TransactionReceiptData,
    context: &TransactionContext,
) -> Vec<ReceiptLog> {
    let expected: Vec<String> = context
        .expected_events
        .iter()
        .map(|topic| topic.to_lowercase())
        .collect();

    receipt
        .logs
        .iter()
        .filter(|log| {
            log.topics
                .first()
                .map(|topic| expected.contains(&topic.to_lowercase()))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}
