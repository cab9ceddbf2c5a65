//! Service layer: chain access, nonce coordination, polling and health.

pub mod health;
pub mod nonce_manager;
pub mod polling;
pub mod provider;

pub use health::{HealthCheckable, HealthThresholds, SystemHealthChecker};
pub use nonce_manager::{NonceManager, NonceManagerTrait};
pub use polling::{PollingManager, PollingOptions, StatusCallback, StatusFetcher};
pub use provider::{BlockTag, EvmProvider, EvmProviderTrait, FeeEstimate, RetryConfig};
