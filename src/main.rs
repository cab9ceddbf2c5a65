//! # Relayer Coordinator
//!
//! A nonce coordination and operation lifecycle service for EVM relayers.
//!
//! ## Features
//!
//! - Atomic nonce assignment across concurrent submitters
//! - Durable operation tracking with bounded retries
//! - Aggregate health reporting
//! - REST API
//!
//! ## Architecture
//!
//! The service is built using Actix-web and provides:
//! - HTTP endpoints for relay submission, operation status and health
//! - In-memory or Redis-backed stores, selected at startup
//!
//! ## Usage
//!
//! ```bash
//! cargo run
//! ```

use std::sync::Arc;

use actix_web::{
    middleware::{self, Logger},
    web, App, HttpServer,
};
use color_eyre::{eyre::eyre, eyre::WrapErr, Result};
use dotenvy::dotenv;
use log::{info, warn};

use relayer_coordinator::api;
use relayer_coordinator::config::ServerConfig;
use relayer_coordinator::constants::OPERATION_RETRY_DELAY_MS;
use relayer_coordinator::domain::{RelayApi, RelayerOperationHandler};
use relayer_coordinator::logging::setup_logging;
use relayer_coordinator::models::RpcConfig;
use relayer_coordinator::repositories::{AtomicStoreStorage, OperationStoreStorage};
use relayer_coordinator::services::{
    EvmProvider, HealthCheckable, HealthThresholds, NonceManager, NonceManagerTrait,
    SystemHealthChecker,
};
use relayer_coordinator::utils::redis::initialize_redis_connection;

type Handler = RelayerOperationHandler<
    NonceManager<AtomicStoreStorage, EvmProvider>,
    EvmProvider,
    OperationStoreStorage,
>;

type HealthChecker = SystemHealthChecker<
    AtomicStoreStorage,
    OperationStoreStorage,
    EvmProvider,
    NonceManager<AtomicStoreStorage, EvmProvider>,
>;

async fn build_stores(
    config: &ServerConfig,
) -> Result<(Arc<AtomicStoreStorage>, Arc<OperationStoreStorage>)> {
    if config.uses_redis_storage() {
        info!("Using Redis-backed stores at {}", config.redis_url);
        let connection = initialize_redis_connection(config).await?;
        let atomic =
            AtomicStoreStorage::new_redis(connection.clone(), config.redis_key_prefix.clone())
                .map_err(|e| eyre!("Failed to initialize atomic store: {}", e))?;
        let operations =
            OperationStoreStorage::new_redis(connection, config.redis_key_prefix.clone())
                .map_err(|e| eyre!("Failed to initialize operation store: {}", e))?;
        Ok((Arc::new(atomic), Arc::new(operations)))
    } else {
        info!("Using in-memory stores, coordination is single-process only");
        Ok((
            Arc::new(AtomicStoreStorage::new_in_memory()),
            Arc::new(OperationStoreStorage::new_in_memory()),
        ))
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install().wrap_err("Failed to initialize error reporting")?;

    dotenv().ok();
    setup_logging();

    let config = Arc::new(ServerConfig::from_env());

    let rpc = RpcConfig::new(config.rpc_url.clone(), config.chain_id)
        .map_err(|e| eyre!("Invalid RPC configuration: {}", e))?;
    let provider = Arc::new(
        EvmProvider::new(rpc, config.rpc_timeout_seconds)
            .map_err(|e| eyre!("Failed to initialize provider: {}", e))?,
    );

    let (atomic_store, operation_store) = build_stores(&config).await?;

    let nonce_manager = Arc::new(NonceManager::new(atomic_store.clone(), provider.clone()));

    let handler: Arc<Handler> = Arc::new(
        RelayerOperationHandler::new(
            nonce_manager.clone(),
            provider.clone(),
            Some(operation_store.clone()),
        )
        .with_retry_policy(config.operation_max_retries, OPERATION_RETRY_DELAY_MS),
    );
    let relay_api: Arc<dyn RelayApi> = handler;

    // Seed nonce state from the chain so the first assignments do not race
    // transactions submitted before this process started.
    for address in &config.monitored_addresses {
        match nonce_manager.sync_nonce(address, config.chain_id).await {
            Ok(pending) => info!("Synced nonce state for {} at {}", address, pending),
            Err(e) => warn!("Could not sync nonce state for {}: {}", address, e),
        }
    }

    let monitored = config
        .monitored_addresses
        .iter()
        .map(|address| (address.clone(), config.chain_id))
        .collect();
    let health_checker: Arc<HealthChecker> = Arc::new(SystemHealthChecker::new(
        atomic_store,
        Some(operation_store),
        provider,
        nonce_manager,
        monitored,
        HealthThresholds {
            store_latency_ms: config.store_latency_threshold_ms,
            provider_latency_ms: config.provider_latency_threshold_ms,
            queue_stale_ms: config.queue_stale_threshold_ms,
        },
    ));
    let health: Arc<dyn HealthCheckable> = health_checker;

    info!("Starting server on {}:{}", config.host, config.port);
    let bind_config = Arc::clone(&config);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            .wrap(Logger::default())
            .app_data(web::Data::new(relay_api.clone()))
            .app_data(web::Data::new(health.clone()))
            .configure(api::configure_routes)
    })
    .bind((bind_config.host.as_str(), bind_config.port))
    .wrap_err_with(|| format!("Failed to bind server to {}:{}", config.host, config.port))?
    .shutdown_timeout(5)
    .run()
    .await
    .wrap_err("Server runtime error")
}
