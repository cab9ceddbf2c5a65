//! Nonce assignment and recovery constants.

/// TTL for the per-address assignment lock. Long enough to cover a store and
/// RPC round-trip, short enough that a crashed holder does not stall peers.
pub const NONCE_LOCK_TTL_MS: u64 = 3_000;

/// Wall-clock budget for acquiring the assignment lock before surfacing a
/// contention error.
pub const NONCE_LOCK_ACQUIRE_BUDGET_MS: u64 = 2_000;

/// Delay between lock acquisition attempts.
pub const NONCE_LOCK_RETRY_DELAY_MS: u64 = 50;

/// Default fee multiplier applied when replacing a stuck transaction.
pub const DEFAULT_BURN_GAS_MULTIPLIER: f64 = 1.5;

/// Gas limit of the zero-value self-transfer used to burn a nonce.
pub const BURN_TX_GAS_LIMIT: u64 = 21_000;
