//! Retry and backoff tuning.

/// Jitter applied to retry delays, as a fraction of the computed delay.
pub const RETRY_JITTER_PERCENT: f64 = 0.1;

/// Default bound on stateful submission retries per operation.
pub const DEFAULT_OPERATION_MAX_RETRIES: u32 = 3;

/// Delay between stateful submission attempts.
pub const OPERATION_RETRY_DELAY_MS: u64 = 500;
