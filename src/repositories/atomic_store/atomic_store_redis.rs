//! Redis implementation of the atomic store.
//!
//! Counters use `INCR`, leases use `SET NX PX` with a per-acquisition UUID
//! token, and release runs a compare-and-delete Lua script so only the
//! current holder can free a lock. All operations are safe across processes
//! sharing the same Redis instance.

use async_trait::async_trait;
use log::debug;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::StoreError;
use crate::repositories::redis_base::RedisRepository;
use crate::repositories::AtomicStoreTrait;

const VALUE_PREFIX: &str = "atomic_value";
const COUNTER_PREFIX: &str = "atomic_counter";
const LOCK_PREFIX: &str = "atomic_lock";

// Deletes the key only if it still holds the caller's token.
const RELEASE_LOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct RedisAtomicStore {
    pub client: Arc<ConnectionManager>,
    pub key_prefix: String,
}

impl RedisRepository for RedisAtomicStore {}

impl fmt::Debug for RedisAtomicStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisAtomicStore")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisAtomicStore {
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

    fn value_key(&self, key: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, VALUE_PREFIX, key)
    }

    fn counter_key(&self, key: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, COUNTER_PREFIX, key)
    }

    fn lock_key(&self, key: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, LOCK_PREFIX, key)
    }
}

#[async_trait]
impl AtomicStoreTrait for RedisAtomicStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let redis_key = self.counter_key(key);
        let mut conn = self.client.as_ref().clone();

        let value: i64 = conn
            .incr(&redis_key, 1)
            .await
            .map_err(|e| self.map_redis_error(e, "incr"))?;

        debug!("Counter {} incremented to {}", key, value);
        Ok(value)
    }

    async fn acquire_lock(&self, key: &str, ttl_ms: u64) -> Result<Option<String>, StoreError> {
        let redis_key = self.lock_key(key);
        let token = Uuid::new_v4().to_string();
        let mut conn = self.client.as_ref().clone();

        let acquired: bool = redis::cmd("SET")
            .arg(&redis_key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| self.map_redis_error(e, "acquire_lock"))?;

        if acquired {
            debug!("Acquired lock {} for {}ms", key, ttl_ms);
            Ok(Some(token))
        } else {
            debug!("Lock {} is held by another caller", key);
            Ok(None)
        }
    }

    async fn release_lock(&self, key: &str, token: &str) -> Result<(), StoreError> {
        let redis_key = self.lock_key(key);
        let mut conn = self.client.as_ref().clone();

        let released: i64 = redis::Script::new(RELEASE_LOCK_SCRIPT)
            .key(&redis_key)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| self.map_redis_error(e, "release_lock"))?;

        if released == 0 {
            debug!("Release of lock {} skipped, token no longer current", key);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let redis_key = self.value_key(key);
        let mut conn = self.client.as_ref().clone();

        let value: Option<String> = conn
            .get(&redis_key)
            .await
            .map_err(|e| self.map_redis_error(e, "get"))?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let redis_key = self.value_key(key);
        let mut conn = self.client.as_ref().clone();

        let _: () = conn
            .set(&redis_key, value)
            .await
            .map_err(|e| self.map_redis_error(e, "set"))?;

        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_ms: u64) -> Result<(), StoreError> {
        let redis_key = self.value_key(key);
        let mut conn = self.client.as_ref().clone();

        let _: () = redis::cmd("SET")
            .arg(&redis_key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| self.map_redis_error(e, "set_with_ttl"))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.client.as_ref().clone();

        let _: () = conn
            .del(&[self.value_key(key), self.counter_key(key)])
            .await
            .map_err(|e| self.map_redis_error(e, "delete"))?;

        Ok(())
    }
}
