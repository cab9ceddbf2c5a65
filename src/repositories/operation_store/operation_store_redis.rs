//! Redis implementation of the operation store.
//!
//! Each record is stored as JSON under `{prefix}:operation:{id}`. A sorted
//! set per status, scored by `created_at`, serves the status-scoped queries
//! oldest-first. `set` moves the id between status indexes inside an atomic
//! pipeline so a record is never visible in two indexes at once.

use async_trait::async_trait;
use log::debug;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::fmt;
use std::sync::Arc;

use crate::models::{OperationRecord, OperationStatus, StoreError};
use crate::repositories::redis_base::RedisRepository;
use crate::repositories::OperationStoreTrait;

const OPERATION_PREFIX: &str = "operation";
const STATUS_INDEX_PREFIX: &str = "operation_status";

#[derive(Clone)]
pub struct RedisOperationStore {
    pub client: Arc<ConnectionManager>,
    pub key_prefix: String,
}

impl RedisRepository for RedisOperationStore {}

impl fmt::Debug for RedisOperationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisOperationStore")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

fn status_name(status: OperationStatus) -> &'static str {
    match status {
        OperationStatus::Queued => "queued",
        OperationStatus::Processing => "processing",
        OperationStatus::Submitted => "submitted",
        OperationStatus::Confirmed => "confirmed",
        OperationStatus::Failed => "failed",
    }
}

impl RedisOperationStore {
    pub fn new(
        connection_manager: Arc<ConnectionManager>,
        key_prefix: String,
    ) -> Result<Self, StoreError> {
        if key_prefix.is_empty() {
            return Err(StoreError::InvalidData(
                "Redis key prefix cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            client: connection_manager,
            key_prefix,
        })
    }

    fn operation_key(&self, id: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, OPERATION_PREFIX, id)
    }

    fn status_index_key(&self, status: OperationStatus) -> String {
        format!(
            "{}:{}:{}",
            self.key_prefix,
            STATUS_INDEX_PREFIX,
            status_name(status)
        )
    }

    async fn list_by_status(
        &self,
        status: OperationStatus,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let index_key = self.status_index_key(status);
        let mut conn = self.client.as_ref().clone();

        let ids: Vec<String> = conn
            .zrange(&index_key, 0, limit as isize - 1)
            .await
            .map_err(|e| self.map_redis_error(e, "list_by_status"))?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let json: Option<String> = conn
                .get(self.operation_key(&id))
                .await
                .map_err(|e| self.map_redis_error(e, "list_by_status_get"))?;
            match json {
                Some(json) => {
                    records.push(self.deserialize_entity(&json, &id, "OperationRecord")?)
                }
                // Index entry without a record means a torn write elsewhere;
                // skip it rather than failing the whole query.
                None => debug!("Operation {} indexed but record missing, skipping", id),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl OperationStoreTrait for RedisOperationStore {
    async fn get(&self, id: &str) -> Result<Option<OperationRecord>, StoreError> {
        if id.is_empty() {
            return Err(StoreError::InvalidData(
                "Operation ID cannot be empty".to_string(),
            ));
        }

        let key = self.operation_key(id);
        let mut conn = self.client.as_ref().clone();

        let json: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| self.map_redis_error(e, "get_operation"))?;

        match json {
            Some(json) => Ok(Some(self.deserialize_entity(&json, id, "OperationRecord")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, record: OperationRecord) -> Result<(), StoreError> {
        if record.id.is_empty() {
            return Err(StoreError::InvalidData(
                "Operation ID cannot be empty".to_string(),
            ));
        }

        let key = self.operation_key(&record.id);
        let json = self.serialize_entity(&record, |r| &r.id, "OperationRecord")?;
        let mut conn = self.client.as_ref().clone();

        // Find which index the previous version lives in, if any.
        let previous: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| self.map_redis_error(e, "set_operation_read_previous"))?;
        let previous_status = match previous {
            Some(json) => {
                let old: OperationRecord =
                    self.deserialize_entity(&json, &record.id, "OperationRecord")?;
                Some(old.status)
            }
            None => None,
        };

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.set(&key, &json);
        if let Some(old_status) = previous_status {
            if old_status != record.status {
                pipe.zrem(self.status_index_key(old_status), &record.id);
            }
        }
        pipe.zadd(
            self.status_index_key(record.status),
            &record.id,
            record.created_at,
        );

        pipe.exec_async(&mut conn)
            .await
            .map_err(|e| self.map_redis_error(e, "set_operation"))?;

        debug!(
            "Stored operation {} with status {:?}",
            record.id, record.status
        );
        Ok(())
    }

    async fn get_queued_operations(
        &self,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        self.list_by_status(OperationStatus::Queued, limit).await
    }

    async fn get_processing_operations(
        &self,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        self.list_by_status(OperationStatus::Processing, limit)
            .await
    }

    async fn get_failed_operations(
        &self,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        self.list_by_status(OperationStatus::Failed, limit).await
    }
}
