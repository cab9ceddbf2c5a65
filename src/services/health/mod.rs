//! Aggregate system health checks.
//!
//! Runs independent probes against the atomic store, the operation store,
//! the chain, per-address nonce synchronization and queue staleness, and
//! folds them into a single [`HealthSnapshot`]. Probes are side-effect-free
//! apart from a throwaway round-trip key; snapshots are computed fresh on
//! every call and never persisted.

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use tokio::time::Instant;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::constants::STUCK_PENDING_GAP;
use crate::models::{ComponentCheck, HealthSnapshot, HealthStatus, NonceSyncStatus};
use crate::repositories::{AtomicStoreTrait, OperationStoreTrait};
use crate::services::nonce_manager::NonceManagerTrait;
use crate::services::provider::{BlockTag, EvmProviderTrait};
use crate::utils::time::now_millis;

/// Latency and staleness limits for the individual probes.
#[derive(Debug, Clone)]
pub struct HealthThresholds {
    pub store_latency_ms: u64,
    pub provider_latency_ms: u64,
    pub queue_stale_ms: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            store_latency_ms: crate::constants::DEFAULT_STORE_LATENCY_THRESHOLD_MS,
            provider_latency_ms: crate::constants::DEFAULT_PROVIDER_LATENCY_THRESHOLD_MS,
            queue_stale_ms: crate::constants::DEFAULT_QUEUE_STALE_THRESHOLD_MS,
        }
    }
}

#[async_trait]
#[cfg_attr(test, automock)]
pub trait HealthCheckable: Send + Sync {
    async fn check(&self) -> HealthSnapshot;
}

pub struct SystemHealthChecker<A, S, P, N>
where
    A: AtomicStoreTrait,
    S: OperationStoreTrait,
    P: EvmProviderTrait,
    N: NonceManagerTrait,
{
    atomic_store: Arc<A>,
    operation_store: Option<Arc<S>>,
    provider: Arc<P>,
    nonce_manager: Arc<N>,
    /// Addresses whose nonce alignment is checked, as `(address, chain_id)`.
    monitored_addresses: Vec<(String, u64)>,
    thresholds: HealthThresholds,
}

fn latency_status(latency_ms: u64, threshold_ms: u64) -> HealthStatus {
    if latency_ms > threshold_ms {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

impl<A, S, P, N> SystemHealthChecker<A, S, P, N>
where
    A: AtomicStoreTrait,
    S: OperationStoreTrait,
    P: EvmProviderTrait,
    N: NonceManagerTrait,
{
    pub fn new(
        atomic_store: Arc<A>,
        operation_store: Option<Arc<S>>,
        provider: Arc<P>,
        nonce_manager: Arc<N>,
        monitored_addresses: Vec<(String, u64)>,
        thresholds: HealthThresholds,
    ) -> Self {
        Self {
            atomic_store,
            operation_store,
            provider,
            nonce_manager,
            monitored_addresses,
            thresholds,
        }
    }

    async fn check_atomic_store(&self) -> ComponentCheck {
        let key = format!("health_probe:{}", Uuid::new_v4());
        let started = Instant::now();

        let probe = async {
            self.atomic_store.set(&key, "probe").await?;
            let read = self.atomic_store.get(&key).await?;
            self.atomic_store.delete(&key).await?;
            Ok::<_, crate::models::StoreError>(read)
        }
        .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match probe {
            Ok(Some(value)) if value == "probe" => ComponentCheck {
                name: "atomic_store".to_string(),
                status: latency_status(latency_ms, self.thresholds.store_latency_ms),
                latency_ms,
                detail: None,
            },
            Ok(_) => ComponentCheck {
                name: "atomic_store".to_string(),
                status: HealthStatus::Unhealthy,
                latency_ms,
                detail: Some("Round-trip read returned unexpected value".to_string()),
            },
            Err(e) => ComponentCheck {
                name: "atomic_store".to_string(),
                status: HealthStatus::Unhealthy,
                latency_ms,
                detail: Some(e.to_string()),
            },
        }
    }

    async fn check_operation_store(&self) -> ComponentCheck {
        let Some(store) = &self.operation_store else {
            return ComponentCheck {
                name: "operation_store".to_string(),
                status: HealthStatus::Healthy,
                latency_ms: 0,
                detail: Some("Not configured, stateless mode".to_string()),
            };
        };

        let started = Instant::now();
        let probe = store.get_queued_operations(1).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match probe {
            Ok(_) => ComponentCheck {
                name: "operation_store".to_string(),
                status: latency_status(latency_ms, self.thresholds.store_latency_ms),
                latency_ms,
                detail: None,
            },
            Err(e) => ComponentCheck {
                name: "operation_store".to_string(),
                status: HealthStatus::Unhealthy,
                latency_ms,
                detail: Some(e.to_string()),
            },
        }
    }

    async fn check_provider(&self) -> ComponentCheck {
        let started = Instant::now();
        let probe = self.provider.get_block_number().await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match probe {
            Ok(0) => ComponentCheck {
                name: "blockchain".to_string(),
                status: HealthStatus::Unhealthy,
                latency_ms,
                detail: Some("Chain reports block number 0".to_string()),
            },
            Ok(_) => ComponentCheck {
                name: "blockchain".to_string(),
                status: latency_status(latency_ms, self.thresholds.provider_latency_ms),
                latency_ms,
                detail: None,
            },
            Err(e) => ComponentCheck {
                name: "blockchain".to_string(),
                status: HealthStatus::Unhealthy,
                latency_ms,
                detail: Some(e.to_string()),
            },
        }
    }

    /// Compares tracked nonce state against the chain's pending and
    /// confirmed counts. Lost local state (desync) is unhealthy; a wide
    /// pending gap suggests a stuck transaction and degrades the snapshot.
    async fn check_nonce_sync(&self, address: &str, chain_id: u64) -> (NonceSyncStatus, HealthStatus) {
        // A failed read is its own finding; never report alignment computed
        // from defaulted counts.
        let probe = async {
            let local = self.nonce_manager.last_assigned(address, chain_id).await?;
            let chain_pending = self
                .provider
                .get_transaction_count(address, BlockTag::Pending)
                .await?;
            let chain_latest = self
                .provider
                .get_transaction_count(address, BlockTag::Latest)
                .await?;
            Ok::<_, crate::models::NonceManagerError>((local, chain_pending, chain_latest))
        }
        .await;

        let (local, chain_pending, chain_latest) = match probe {
            Ok(counts) => counts,
            Err(e) => {
                warn!(
                    "Nonce sync probe for {} on chain {} failed: {}",
                    address, chain_id, e
                );
                return (
                    NonceSyncStatus {
                        address: address.to_string(),
                        chain_id,
                        local_next: 0,
                        chain_pending: 0,
                        chain_latest: 0,
                        in_sync: false,
                        pending_gap: 0,
                        detail: Some(e.to_string()),
                    },
                    HealthStatus::Unhealthy,
                );
            }
        };

        let local_next = match local {
            Some(last) => (last + 1).max(0) as u64,
            None => chain_pending,
        };
        let desynced = matches!(local, Some(last) if last < chain_latest as i64 - 1 && last >= 0);
        let pending_gap = chain_pending.saturating_sub(chain_latest);
        let stuck = pending_gap > STUCK_PENDING_GAP;

        let status = if desynced {
            warn!(
                "Nonce state for {} on chain {} is behind confirmed count (local {:?}, confirmed {})",
                address, chain_id, local, chain_latest
            );
            HealthStatus::Unhealthy
        } else if stuck {
            warn!(
                "Address {} on chain {} has {} unmined transactions, queue may be stuck",
                address, chain_id, pending_gap
            );
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        (
            NonceSyncStatus {
                address: address.to_string(),
                chain_id,
                local_next,
                chain_pending,
                chain_latest,
                in_sync: !desynced,
                pending_gap,
                detail: None,
            },
            status,
        )
    }

    async fn check_queue_staleness(&self) -> ComponentCheck {
        let Some(store) = &self.operation_store else {
            return ComponentCheck {
                name: "queue".to_string(),
                status: HealthStatus::Healthy,
                latency_ms: 0,
                detail: Some("Not configured, stateless mode".to_string()),
            };
        };

        let started = Instant::now();
        let probe = store.get_queued_operations(1).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match probe {
            Ok(records) => {
                let oldest_age_ms = records
                    .first()
                    .map(|r| (now_millis() - r.created_at).max(0) as u64);
                match oldest_age_ms {
                    Some(age) if age > self.thresholds.queue_stale_ms => ComponentCheck {
                        name: "queue".to_string(),
                        status: HealthStatus::Degraded,
                        latency_ms,
                        detail: Some(format!("Oldest queued operation is {}ms old", age)),
                    },
                    _ => ComponentCheck {
                        name: "queue".to_string(),
                        status: HealthStatus::Healthy,
                        latency_ms,
                        detail: None,
                    },
                }
            }
            Err(e) => ComponentCheck {
                name: "queue".to_string(),
                status: HealthStatus::Unhealthy,
                latency_ms,
                detail: Some(e.to_string()),
            },
        }
    }
}

#[async_trait]
impl<A, S, P, N> HealthCheckable for SystemHealthChecker<A, S, P, N>
where
    A: AtomicStoreTrait,
    S: OperationStoreTrait,
    P: EvmProviderTrait,
    N: NonceManagerTrait,
{
    async fn check(&self) -> HealthSnapshot {
        let components = vec![
            self.check_atomic_store().await,
            self.check_operation_store().await,
            self.check_provider().await,
            self.check_queue_staleness().await,
        ];

        let mut nonces = Vec::with_capacity(self.monitored_addresses.len());
        let mut aggregate = components
            .iter()
            .fold(HealthStatus::Healthy, |acc, c| acc.worst(c.status));

        for (address, chain_id) in &self.monitored_addresses {
            let (sync, status) = self.check_nonce_sync(address, *chain_id).await;
            aggregate = aggregate.worst(status);
            nonces.push(sync);
        }

        HealthSnapshot {
            status: aggregate,
            checked_at: now_millis(),
            components,
            nonces,
        }
    }
}
