//! Health report models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Combines component statuses; the worst one wins.
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        use HealthStatus::*;
        match (self, other) {
            (Unhealthy, _) | (_, Unhealthy) => Unhealthy,
            (Degraded, _) | (_, Degraded) => Degraded,
            _ => Healthy,
        }
    }
}

/// Per-account nonce alignment between the local store and the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NonceSyncStatus {
    pub address: String,
    pub chain_id: u64,
    pub local_next: u64,
    pub chain_pending: u64,
    pub chain_latest: u64,
    pub in_sync: bool,
    /// Nonces broadcast but not yet mined. A large gap flags stuck traffic.
    pub pending_gap: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub checked_at: i64,
    pub components: Vec<ComponentCheck>,
    pub nonces: Vec<NonceSyncStatus>,
}
