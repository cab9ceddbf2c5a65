//! This module provides an in-memory implementation of the atomic store.
//!
//! The `InMemoryAtomicStore` struct backs counters, bookkeeping values and
//! leases with `DashMap`s. Lease expiry is evaluated lazily on access, so an
//! expired lock is reclaimable without a background sweeper. Valid for
//! single-process deployments only.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::StoreError;
use crate::repositories::AtomicStoreTrait;
use crate::utils::time::now_millis;

#[derive(Debug, Default, Clone)]
pub struct InMemoryAtomicStore {
    counters: DashMap<String, i64>,
    // key -> (value, expires_at_ms); None means no expiry
    values: DashMap<String, (String, Option<i64>)>,
    // key -> (holder token, expires_at_ms)
    locks: DashMap<String, (String, i64)>,
}

impl InMemoryAtomicStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AtomicStoreTrait for InMemoryAtomicStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut entry = self.counters.entry(key.to_string()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    async fn acquire_lock(&self, key: &str, ttl_ms: u64) -> Result<Option<String>, StoreError> {
        let now = now_millis();
        let token = Uuid::new_v4().to_string();

        // The entry API serializes access per key, so check-and-insert is
        // atomic with respect to concurrent acquirers.
        let mut acquired = false;
        self.locks
            .entry(key.to_string())
            .and_modify(|(held_token, expires_at)| {
                if *expires_at <= now {
                    *held_token = token.clone();
                    *expires_at = now + ttl_ms as i64;
                    acquired = true;
                }
            })
            .or_insert_with(|| {
                acquired = true;
                (token.clone(), now + ttl_ms as i64)
            });

        Ok(if acquired { Some(token) } else { None })
    }

    async fn release_lock(&self, key: &str, token: &str) -> Result<(), StoreError> {
        // Compare-and-delete: a stale holder must not release a lock that
        // was reacquired after its lease expired.
        self.locks
            .remove_if(key, |_, (held_token, _)| held_token == token);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = now_millis();
        if let Some(entry) = self.values.get(key) {
            let (value, expires_at) = entry.value();
            if let Some(expires_at) = expires_at {
                if *expires_at <= now {
                    drop(entry);
                    // Re-check under the removal guard: a concurrent set may
                    // have replaced the expired entry with a live one.
                    self.values.remove_if(key, |_, (_, expires_at)| {
                        matches!(expires_at, Some(at) if *at <= now)
                    });
                    return Ok(None);
                }
            }
            return Ok(Some(value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .insert(key.to_string(), (value.to_string(), None));
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_ms: u64) -> Result<(), StoreError> {
        self.values.insert(
            key.to_string(),
            (value.to_string(), Some(now_millis() + ttl_ms as i64)),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        self.counters.remove(key);
        Ok(())
    }
}
