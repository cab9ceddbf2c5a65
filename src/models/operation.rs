//! Operation lifecycle model.
//!
//! A relay operation moves through a small state machine:
//! `Queued -> Processing -> Submitted -> Confirmed | Failed`, with a bounded
//! `Processing -> Queued` loop for transient submission failures. `Confirmed`
//! and `Failed` are terminal.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::RelayRequest;
use crate::utils::time::now_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Queued,
    Processing,
    Submitted,
    Confirmed,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        crate::constants::FINAL_OPERATION_STATUSES.contains(self)
    }
}

/// Persistent record of a relay operation. The record is the source of truth
/// for idempotent replay: a second submission with the same id returns the
/// outcome recorded here instead of touching the chain again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OperationRecord {
    pub id: String,
    pub status: OperationStatus,
    pub request: RelayRequest,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
}

impl OperationRecord {
    pub fn new(id: impl Into<String>, request: RelayRequest) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            status: OperationStatus::Queued,
            request,
            created_at: now,
            updated_at: now,
            transaction_hash: None,
            error: None,
            retry_count: 0,
            nonce: None,
        }
    }

    /// Whether moving from the current status to `next` is a legal lifecycle
    /// transition. Terminal statuses accept nothing.
    pub fn can_transition_to(&self, next: OperationStatus) -> bool {
        use OperationStatus::*;
        match (self.status, next) {
            (Queued, Processing) => true,
            (Processing, Submitted) => true,
            (Processing, Queued) => true,
            (Processing, Failed) => true,
            (Queued, Failed) => true,
            (Submitted, Confirmed) => true,
            (Submitted, Failed) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelayRequest;

    fn test_request() -> RelayRequest {
        RelayRequest {
            address: "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".to_string(),
            chain_id: 1,
            to: Some("0x742d35Cc6634C0532925a3b844Bc454e4438f44e".to_string()),
            value: Some(1_000_000_000_000_000_000),
            data: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            nonce: None,
            operation_id: None,
        }
    }

    #[test]
    fn test_new_record_starts_queued() {
        let record = OperationRecord::new("op-1", test_request());
        assert_eq!(record.status, OperationStatus::Queued);
        assert_eq!(record.retry_count, 0);
        assert!(record.transaction_hash.is_none());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OperationStatus::Confirmed.is_terminal());
        assert!(OperationStatus::Failed.is_terminal());
        assert!(!OperationStatus::Queued.is_terminal());
        assert!(!OperationStatus::Processing.is_terminal());
        assert!(!OperationStatus::Submitted.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        let mut record = OperationRecord::new("op-1", test_request());
        assert!(record.can_transition_to(OperationStatus::Processing));
        assert!(!record.can_transition_to(OperationStatus::Confirmed));

        record.status = OperationStatus::Processing;
        assert!(record.can_transition_to(OperationStatus::Submitted));
        assert!(record.can_transition_to(OperationStatus::Queued));
        assert!(record.can_transition_to(OperationStatus::Failed));

        record.status = OperationStatus::Submitted;
        assert!(record.can_transition_to(OperationStatus::Confirmed));
        assert!(!record.can_transition_to(OperationStatus::Queued));
    }

    #[test]
    fn test_terminal_statuses_accept_nothing() {
        let mut record = OperationRecord::new("op-1", test_request());
        record.status = OperationStatus::Confirmed;
        for next in [
            OperationStatus::Queued,
            OperationStatus::Processing,
            OperationStatus::Submitted,
            OperationStatus::Failed,
        ] {
            assert!(!record.can_transition_to(next));
        }
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&OperationStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(
            serde_json::from_str::<OperationStatus>("\"confirmed\"").unwrap(),
            OperationStatus::Confirmed
        );
    }
}
