//! Base Redis repository functionality shared across all Redis implementations.

use crate::models::StoreError;
use log::{error, warn};
use redis::RedisError;
use serde::{Deserialize, Serialize};

/// Base trait for Redis repositories providing common functionality
pub trait RedisRepository {
    fn serialize_entity<T, F>(
        &self,
        entity: &T,
        id_extractor: F,
        entity_type: &str,
    ) -> Result<String, StoreError>
    where
        T: Serialize,
        F: Fn(&T) -> &str,
    {
        serde_json::to_string(entity).map_err(|e| {
            let id = id_extractor(entity);
            error!("Serialization failed for {} {}: {}", entity_type, id, e);
            StoreError::InvalidData(format!("Failed to serialize {} {}: {}", entity_type, id, e))
        })
    }

    /// Deserialize entity with detailed error context
    fn deserialize_entity<T>(
        &self,
        json: &str,
        entity_id: &str,
        entity_type: &str,
    ) -> Result<T, StoreError>
    where
        T: for<'de> Deserialize<'de>,
    {
        serde_json::from_str(json).map_err(|e| {
            error!(
                "Deserialization failed for {} {}: {}",
                entity_type, entity_id, e
            );
            StoreError::InvalidData(format!(
                "Failed to deserialize {} {}: {} (JSON length: {})",
                entity_type,
                entity_id,
                e,
                json.len()
            ))
        })
    }

    /// Convert Redis errors to appropriate StoreError types
    fn map_redis_error(&self, error: RedisError, context: &str) -> StoreError {
        warn!("Redis operation failed in context '{}': {}", context, error);

        match error.kind() {
            redis::ErrorKind::TypeError => StoreError::InvalidData(format!(
                "Redis data type error in operation '{}': {}",
                context, error
            )),
            redis::ErrorKind::AuthenticationFailed => {
                StoreError::ConnectionError("Redis authentication failed".to_string())
            }
            redis::ErrorKind::NoScriptError => StoreError::InvalidData(format!(
                "Redis script error in operation '{}': {}",
                context, error
            )),
            redis::ErrorKind::ReadOnly => StoreError::Unavailable(format!(
                "Redis is read-only in operation '{}': {}",
                context, error
            )),
            redis::ErrorKind::BusyLoadingError => StoreError::Unavailable(format!(
                "Redis is busy in operation '{}': {}",
                context, error
            )),
            redis::ErrorKind::IoError => StoreError::ConnectionError(format!(
                "Redis connection failed in operation '{}': {}",
                context, error
            )),
            _ => StoreError::Other(format!("Redis operation '{}' failed: {}", context, error)),
        }
    }
}
