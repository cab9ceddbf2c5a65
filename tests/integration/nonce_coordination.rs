//! Nonce assignment behavior over the real manager, in-memory atomic store
//! and a stub chain.

use std::sync::Arc;

use relayer_coordinator::repositories::AtomicStoreStorage;
use relayer_coordinator::services::nonce_manager::{NonceManager, NonceManagerTrait};

use crate::stub_provider::StubProvider;

const ADDRESS: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
const CHAIN_ID: u64 = 1;

fn manager(provider: Arc<StubProvider>) -> NonceManager<AtomicStoreStorage, StubProvider> {
    NonceManager::new(Arc::new(AtomicStoreStorage::new_in_memory()), provider)
}

#[tokio::test]
async fn test_concurrent_assignments_are_gapless() {
    let provider = Arc::new(StubProvider::new(5, 5));
    let manager = Arc::new(manager(provider));

    let mut handles = Vec::new();
    for _ in 0..3 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.assign_nonce(ADDRESS, CHAIN_ID).await.unwrap()
        }));
    }

    let mut nonces = Vec::new();
    for handle in handles {
        nonces.push(handle.await.unwrap());
    }
    nonces.sort_unstable();

    assert_eq!(nonces, vec![5, 6, 7]);
}

#[tokio::test]
async fn test_assignment_tracks_external_chain_activity() {
    let provider = Arc::new(StubProvider::new(5, 5));
    let manager = manager(provider.clone());

    assert_eq!(manager.assign_nonce(ADDRESS, CHAIN_ID).await.unwrap(), 5);

    // Another process pushed the pending count past our local state.
    provider
        .pending_count
        .store(20, std::sync::atomic::Ordering::SeqCst);

    assert_eq!(manager.assign_nonce(ADDRESS, CHAIN_ID).await.unwrap(), 20);
}

#[tokio::test]
async fn test_reset_resynchronizes_from_chain() {
    let provider = Arc::new(StubProvider::new(5, 5));
    let manager = manager(provider.clone());

    manager.assign_nonce(ADDRESS, CHAIN_ID).await.unwrap();
    manager.assign_nonce(ADDRESS, CHAIN_ID).await.unwrap();

    manager.reset_nonce(ADDRESS, CHAIN_ID).await.unwrap();
    assert_eq!(
        manager.last_assigned(ADDRESS, CHAIN_ID).await.unwrap(),
        None
    );

    // After reset the next assignment comes from the chain's pending count.
    let pending = provider
        .pending_count
        .load(std::sync::atomic::Ordering::SeqCst);
    assert_eq!(
        manager.assign_nonce(ADDRESS, CHAIN_ID).await.unwrap(),
        pending
    );
}

#[tokio::test]
async fn test_burn_sends_self_transfer_with_boosted_fees() {
    let provider = Arc::new(StubProvider::new(5, 5));
    let manager = manager(provider.clone());

    let hash = manager
        .burn_nonce(7, ADDRESS, CHAIN_ID, None)
        .await
        .unwrap();
    assert!(!hash.is_empty());

    let sent = provider.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let tx = &sent[0];
    assert_eq!(tx.nonce, Some(7));
    // Default multiplier is 1.5x over the 30 gwei estimate.
    assert_eq!(tx.max_fee_per_gas, Some(45_000_000_000));
    assert_eq!(tx.max_priority_fee_per_gas, Some(3_000_000_000));
}
