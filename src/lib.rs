//! Relayer Coordination Library
//!
//! This library coordinates blockchain transaction submission through a small
//! pool of shared signing addresses without nonce collisions. It includes:
//!
//! - Atomic nonce assignment with distributed lease-based locking
//! - Durable operation lifecycle tracking with bounded retries
//! - Client-facing polling for asynchronous operations
//! - Stuck-transaction recovery (nonce burning)
//! - Aggregate health reporting over stores, chain connectivity and queues
//!
//! # Module Structure
//!
//! - `api`: HTTP routes (health, relay)
//! - `config`: Environment-driven configuration
//! - `domain`: Operation handler and response facade
//! - `logging`: Logging setup
//! - `models`: Wire and persistence data structures
//! - `repositories`: Atomic store and operation store implementations
//! - `services`: Nonce manager, polling, health checks, EVM provider
//! - `utils`: Common helpers

pub mod api;
pub mod config;
pub mod constants;
pub mod domain;
pub mod logging;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;
