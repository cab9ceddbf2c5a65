//! Server configuration sourced from the environment.

use std::env;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address the server will bind to.
    pub host: String,
    /// The port number the server will listen on.
    pub port: u16,
    /// The URL for the Redis instance. Required when `storage_backend` is
    /// `redis`.
    pub redis_url: String,
    /// Timeout for establishing the Redis connection.
    pub redis_connection_timeout_ms: u64,
    /// Prefix applied to every Redis key owned by this deployment.
    pub redis_key_prefix: String,
    /// `redis` for multi-process deployments, `in-memory` otherwise.
    pub storage_backend: String,
    /// JSON-RPC endpoint of the chain this deployment relays to.
    pub rpc_url: String,
    /// Chain id of the RPC endpoint.
    pub chain_id: u64,
    /// Per-call RPC timeout.
    pub rpc_timeout_seconds: u64,
    pub provider_max_retries: u8,
    pub provider_retry_base_delay_ms: u64,
    pub provider_retry_max_delay_ms: u64,
    /// Maximum transient-failure requeues per operation.
    pub operation_max_retries: u32,
    pub store_latency_threshold_ms: u64,
    pub provider_latency_threshold_ms: u64,
    pub queue_stale_threshold_ms: u64,
    /// Addresses whose nonce alignment the health checker monitors,
    /// comma-separated.
    pub monitored_addresses: Vec<String>,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Creates a new `ServerConfig` instance from environment variables.
    ///
    /// # Panics
    ///
    /// Panics if `RPC_URL` is not set, or if `REDIS_URL` is not set while
    /// `STORAGE_BACKEND` is `redis`. Both are required for the server to
    /// function.
    ///
    /// # Defaults
    ///
    /// - `HOST` defaults to `"0.0.0.0"`, `APP_PORT` to `8080`.
    /// - `STORAGE_BACKEND` defaults to `"in-memory"`.
    /// - `CHAIN_ID` defaults to `1`.
    /// - Retry and health thresholds fall back to the crate constants.
    pub fn from_env() -> Self {
        let storage_backend =
            env::var("STORAGE_BACKEND").unwrap_or_else(|_| "in-memory".to_string());
        let redis_url = match storage_backend.as_str() {
            "redis" => env::var("REDIS_URL")
                .expect("REDIS_URL must be set when STORAGE_BACKEND is redis"),
            _ => env::var("REDIS_URL").unwrap_or_default(),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("APP_PORT", 8080),
            redis_url,
            redis_connection_timeout_ms: env_or("REDIS_CONNECTION_TIMEOUT_MS", 10_000),
            redis_key_prefix: env::var("REDIS_KEY_PREFIX")
                .unwrap_or_else(|_| "relayer-coordinator".to_string()),
            storage_backend,
            rpc_url: env::var("RPC_URL").expect("RPC_URL must be set"),
            chain_id: env_or("CHAIN_ID", 1),
            rpc_timeout_seconds: env_or("RPC_TIMEOUT_SECONDS", 30),
            provider_max_retries: env_or("PROVIDER_MAX_RETRIES", 3),
            provider_retry_base_delay_ms: env_or("PROVIDER_RETRY_BASE_DELAY_MS", 100),
            provider_retry_max_delay_ms: env_or("PROVIDER_RETRY_MAX_DELAY_MS", 2_000),
            operation_max_retries: env_or(
                "OPERATION_MAX_RETRIES",
                crate::constants::DEFAULT_OPERATION_MAX_RETRIES,
            ),
            store_latency_threshold_ms: env_or(
                "STORE_LATENCY_THRESHOLD_MS",
                crate::constants::DEFAULT_STORE_LATENCY_THRESHOLD_MS,
            ),
            provider_latency_threshold_ms: env_or(
                "PROVIDER_LATENCY_THRESHOLD_MS",
                crate::constants::DEFAULT_PROVIDER_LATENCY_THRESHOLD_MS,
            ),
            queue_stale_threshold_ms: env_or(
                "QUEUE_STALE_THRESHOLD_MS",
                crate::constants::DEFAULT_QUEUE_STALE_THRESHOLD_MS,
            ),
            monitored_addresses: env::var("MONITORED_ADDRESSES")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn uses_redis_storage(&self) -> bool {
        self.storage_backend == "redis"
    }
}
