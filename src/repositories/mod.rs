//! Repository layer for the nonce coordinator.
//!
//! Two storage concerns live here, each with an in-memory and a Redis-backed
//! implementation behind the same trait:
//!
//! - [`AtomicStoreTrait`]: key/value bookkeeping with atomic increment and
//!   lease-based locks, the coordination substrate for nonce assignment.
//! - [`OperationStoreTrait`]: the passive ledger of relay operations and
//!   their lifecycle state.
//!
//! The in-memory variants use DashMap and are valid for single-instance
//! deployments only; the Redis variants are safe across processes.

pub mod atomic_store;
pub mod operation_store;
pub mod redis_base;

pub use atomic_store::*;
pub use operation_store::*;

pub use crate::models::StoreError;
