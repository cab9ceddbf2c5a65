//! Operation lifecycle constants.

use crate::models::OperationStatus;

/// Operation statuses that are considered final states.
pub const FINAL_OPERATION_STATUSES: &[OperationStatus] =
    &[OperationStatus::Confirmed, OperationStatus::Failed];

/// Default polling interval for in-flight operations.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Default wall-clock budget for a single polling call.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 60_000;
