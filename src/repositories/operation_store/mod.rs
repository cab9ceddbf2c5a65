//! Operation Store Repository Module
//!
//! The operation store is the passive ledger of relay operations. It carries
//! no retry or transition logic of its own; the handler owns the lifecycle
//! and the store persists whatever record it is handed. Status-scoped queries
//! exist so the health checker and out-of-band workers can find queued,
//! processing and failed work efficiently.
//!
//! ## Repository Implementations
//!
//! - [`InMemoryOperationStore`]: DashMap-backed, single-process deployments
//! - [`RedisOperationStore`]: Redis-backed with per-status indexes ordered by
//!   creation time

pub mod operation_store_in_memory;
pub mod operation_store_redis;

pub use operation_store_in_memory::InMemoryOperationStore;
pub use operation_store_redis::RedisOperationStore;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::models::{OperationRecord, StoreError};

#[async_trait]
#[cfg_attr(test, automock)]
pub trait OperationStoreTrait: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<OperationRecord>, StoreError>;

    /// Persists `record` under its id, replacing any previous version and
    /// moving it between status indexes as needed.
    async fn set(&self, record: OperationRecord) -> Result<(), StoreError>;

    /// Oldest-first queued operations, capped at `limit`.
    async fn get_queued_operations(&self, limit: usize)
        -> Result<Vec<OperationRecord>, StoreError>;

    async fn get_processing_operations(
        &self,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, StoreError>;

    async fn get_failed_operations(&self, limit: usize)
        -> Result<Vec<OperationRecord>, StoreError>;
}

/// Enum wrapper for different operation store implementations
#[derive(Debug, Clone)]
pub enum OperationStoreStorage {
    InMemory(InMemoryOperationStore),
    Redis(RedisOperationStore),
}

impl OperationStoreStorage {
    pub fn new_in_memory() -> Self {
        Self::InMemory(InMemoryOperationStore::new())
    }

    pub fn new_redis(
        connection_manager: Arc<ConnectionManager>,
        key_prefix: String,
    ) -> Result<Self, StoreError> {
        Ok(Self::Redis(RedisOperationStore::new(
            connection_manager,
            key_prefix,
        )?))
    }
}

#[async_trait]
impl OperationStoreTrait for OperationStoreStorage {
    async fn get(&self, id: &str) -> Result<Option<OperationRecord>, StoreError> {
        match self {
            OperationStoreStorage::InMemory(store) => store.get(id).await,
            OperationStoreStorage::Redis(store) => store.get(id).await,
        }
    }

    async fn set(&self, record: OperationRecord) -> Result<(), StoreError> {
        match self {
            OperationStoreStorage::InMemory(store) => store.set(record).await,
            OperationStoreStorage::Redis(store) => store.set(record).await,
        }
    }

    async fn get_queued_operations(
        &self,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        match self {
            OperationStoreStorage::InMemory(store) => store.get_queued_operations(limit).await,
            OperationStoreStorage::Redis(store) => store.get_queued_operations(limit).await,
        }
    }

    async fn get_processing_operations(
        &self,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        match self {
            OperationStoreStorage::InMemory(store) => store.get_processing_operations(limit).await,
            OperationStoreStorage::Redis(store) => store.get_processing_operations(limit).await,
        }
    }

    async fn get_failed_operations(
        &self,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        match self {
            OperationStoreStorage::InMemory(store) => store.get_failed_operations(limit).await,
            OperationStoreStorage::Redis(store) => store.get_failed_operations(limit).await,
        }
    }
}
