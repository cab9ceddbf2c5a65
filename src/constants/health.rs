//! Health probe thresholds.

/// Store round-trips slower than this report the component as degraded.
pub const DEFAULT_STORE_LATENCY_THRESHOLD_MS: u64 = 100;

/// Chain reads slower than this report connectivity as degraded.
pub const DEFAULT_PROVIDER_LATENCY_THRESHOLD_MS: u64 = 1_000;

/// A queued operation older than this marks the queue as stale.
pub const DEFAULT_QUEUE_STALE_THRESHOLD_MS: u64 = 300_000;

/// Gap between pending and confirmed transaction counts above which an
/// address is considered blocked by an unmined transaction.
pub const STUCK_PENDING_GAP: u64 = 5;
