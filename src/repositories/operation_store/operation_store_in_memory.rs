//! This module provides an in-memory implementation of the operation store.
//!
//! Records live in a `DashMap` keyed by operation id; status queries filter
//! and sort on demand. Good enough for single-process deployments and tests.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::{OperationRecord, OperationStatus, StoreError};
use crate::repositories::OperationStoreTrait;

#[derive(Debug, Default, Clone)]
pub struct InMemoryOperationStore {
    store: DashMap<String, OperationRecord>,
}

impl InMemoryOperationStore {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    fn list_by_status(&self, status: OperationStatus, limit: usize) -> Vec<OperationRecord> {
        let mut records: Vec<OperationRecord> = self
            .store
            .iter()
            .filter(|entry| entry.value().status == status)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.created_at);
        records.truncate(limit);
        records
    }
}

#[async_trait]
impl OperationStoreTrait for InMemoryOperationStore {
    async fn get(&self, id: &str) -> Result<Option<OperationRecord>, StoreError> {
        Ok(self.store.get(id).map(|entry| entry.value().clone()))
    }

    async fn set(&self, record: OperationRecord) -> Result<(), StoreError> {
        if record.id.is_empty() {
            return Err(StoreError::InvalidData(
                "Operation ID cannot be empty".to_string(),
            ));
        }
        self.store.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_queued_operations(
        &self,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        Ok(self.list_by_status(OperationStatus::Queued, limit))
    }

    async fn get_processing_operations(
        &self,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        Ok(self.list_by_status(OperationStatus::Processing, limit))
    }

    async fn get_failed_operations(
        &self,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        Ok(self.list_by_status(OperationStatus::Failed, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelayRequest;

    fn test_record(id: &str, created_at: i64) -> OperationRecord {
        let mut record = OperationRecord::new(
            id,
            RelayRequest {
                address: "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".to_string(),
                chain_id: 1,
                to: Some("0x742d35Cc6634C0532925a3b844Bc454e4438f44e".to_string()),
                value: None,
                data: None,
                max_fee_per_gas: None,
                max_priority_fee_per_gas: None,
                nonce: None,
                operation_id: None,
            },
        );
        record.created_at = created_at;
        record
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryOperationStore::new();

        assert!(store.get("op-1").await.unwrap().is_none());

        store.set(test_record("op-1", 100)).await.unwrap();
        let record = store.get("op-1").await.unwrap().unwrap();
        assert_eq!(record.id, "op-1");
        assert_eq!(record.status, OperationStatus::Queued);
    }

    #[tokio::test]
    async fn test_empty_id_rejected() {
        let store = InMemoryOperationStore::new();
        let result = store.set(test_record("", 100)).await;
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_set_replaces_existing() {
        let store = InMemoryOperationStore::new();

        store.set(test_record("op-1", 100)).await.unwrap();
        let mut updated = test_record("op-1", 100);
        updated.status = OperationStatus::Submitted;
        updated.transaction_hash = Some("0xabc".to_string());
        store.set(updated).await.unwrap();

        let record = store.get("op-1").await.unwrap().unwrap();
        assert_eq!(record.status, OperationStatus::Submitted);
        assert_eq!(record.transaction_hash.as_deref(), Some("0xabc"));
        assert!(store.get_queued_operations(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queued_query_is_oldest_first_and_capped() {
        let store = InMemoryOperationStore::new();

        store.set(test_record("op-newer", 300)).await.unwrap();
        store.set(test_record("op-oldest", 100)).await.unwrap();
        store.set(test_record("op-middle", 200)).await.unwrap();

        let queued = store.get_queued_operations(2).await.unwrap();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0].id, "op-oldest");
        assert_eq!(queued[1].id, "op-middle");
    }

    #[tokio::test]
    async fn test_status_queries_are_disjoint() {
        let store = InMemoryOperationStore::new();

        store.set(test_record("op-queued", 100)).await.unwrap();

        let mut processing = test_record("op-processing", 200);
        processing.status = OperationStatus::Processing;
        store.set(processing).await.unwrap();

        let mut failed = test_record("op-failed", 300);
        failed.status = OperationStatus::Failed;
        failed.error = Some("boom".to_string());
        store.set(failed).await.unwrap();

        assert_eq!(store.get_queued_operations(10).await.unwrap().len(), 1);
        assert_eq!(store.get_processing_operations(10).await.unwrap().len(), 1);
        assert_eq!(store.get_failed_operations(10).await.unwrap().len(), 1);
    }
}
