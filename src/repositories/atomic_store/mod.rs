//! Atomic Store Repository Module
//!
//! The atomic store is the coordination substrate for nonce assignment: a
//! key/value store exposing atomic increment and lease-based locks. Anything
//! requiring exclusivity goes through `incr`/`acquire_lock`; plain `get`/`set`
//! is reserved for read-mostly bookkeeping where staleness is tolerable.
//!
//! ## Repository Implementations
//!
//! - [`InMemoryAtomicStore`]: DashMap-backed, single-process deployments only
//! - [`RedisAtomicStore`]: Redis-backed, safe across processes
//!
//! ## Lock semantics
//!
//! `acquire_lock` fails fast with `None` when the key is held; it never
//! blocks. `release_lock` only deletes the lock if the stored token still
//! matches the caller's, so a holder whose lease expired cannot release a
//! lock someone else has since acquired. Mismatched release is a no-op, not
//! an error.

pub mod atomic_store_in_memory;
pub mod atomic_store_redis;

pub use atomic_store_in_memory::InMemoryAtomicStore;
pub use atomic_store_redis::RedisAtomicStore;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::models::StoreError;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait AtomicStoreTrait: Send + Sync {
    /// Atomically increments the counter at `key`, returning the new value.
    /// The first call on an absent key returns 1.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Attempts to take a lease on `key` for `ttl_ms`. Returns the holder
    /// token on success, `None` if the key is already held.
    async fn acquire_lock(&self, key: &str, ttl_ms: u64) -> Result<Option<String>, StoreError>;

    /// Releases the lease on `key` if `token` matches the current holder.
    async fn release_lock(&self, key: &str, token: &str) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_ms: u64) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Enum wrapper for different atomic store implementations
#[derive(Debug, Clone)]
pub enum AtomicStoreStorage {
    InMemory(InMemoryAtomicStore),
    Redis(RedisAtomicStore),
}

impl AtomicStoreStorage {
    pub fn new_in_memory() -> Self {
        Self::InMemory(InMemoryAtomicStore::new())
    }

    pub fn new_redis(
        connection_manager: Arc<ConnectionManager>,
        key_prefix: String,
    ) -> Result<Self, StoreError> {
        Ok(Self::Redis(RedisAtomicStore::new(
            connection_manager,
            key_prefix,
        )?))
    }
}

#[async_trait]
impl AtomicStoreTrait for AtomicStoreStorage {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        match self {
            AtomicStoreStorage::InMemory(store) => store.incr(key).await,
            AtomicStoreStorage::Redis(store) => store.incr(key).await,
        }
    }

    async fn acquire_lock(&self, key: &str, ttl_ms: u64) -> Result<Option<String>, StoreError> {
        match self {
            AtomicStoreStorage::InMemory(store) => store.acquire_lock(key, ttl_ms).await,
            AtomicStoreStorage::Redis(store) => store.acquire_lock(key, ttl_ms).await,
        }
    }

    async fn release_lock(&self, key: &str, token: &str) -> Result<(), StoreError> {
        match self {
            AtomicStoreStorage::InMemory(store) => store.release_lock(key, token).await,
            AtomicStoreStorage::Redis(store) => store.release_lock(key, token).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            AtomicStoreStorage::InMemory(store) => store.get(key).await,
            AtomicStoreStorage::Redis(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self {
            AtomicStoreStorage::InMemory(store) => store.set(key, value).await,
            AtomicStoreStorage::Redis(store) => store.set(key, value).await,
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_ms: u64) -> Result<(), StoreError> {
        match self {
            AtomicStoreStorage::InMemory(store) => store.set_with_ttl(key, value, ttl_ms).await,
            AtomicStoreStorage::Redis(store) => store.set_with_ttl(key, value, ttl_ms).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            AtomicStoreStorage::InMemory(store) => store.delete(key).await,
            AtomicStoreStorage::Redis(store) => store.delete(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_storage_creation() {
        let store = AtomicStoreStorage::new_in_memory();
        matches!(store, AtomicStoreStorage::InMemory(_));
    }

    #[tokio::test]
    async fn test_enum_wrapper_delegation() {
        let store = AtomicStoreStorage::new_in_memory();

        assert_eq!(store.incr("counter").await.unwrap(), 1);
        assert_eq!(store.incr("counter").await.unwrap(), 2);

        store.set("key", "value").await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), Some("value".to_string()));

        store.delete("key").await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), None);
    }
}
