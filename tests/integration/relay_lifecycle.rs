//! Full relay lifecycle over the real handler, nonce manager, in-memory
//! stores and a stub chain.

use std::sync::Arc;

use relayer_coordinator::domain::{RelayApi, RelayerOperationHandler, ResponseHandle};
use relayer_coordinator::models::{OperationStatus, RelayRequest, RelayerResponse};
use relayer_coordinator::repositories::{
    AtomicStoreStorage, InMemoryOperationStore, OperationStoreTrait,
};
use relayer_coordinator::services::nonce_manager::NonceManager;
use relayer_coordinator::services::polling::{PollingManager, PollingOptions};

use crate::stub_provider::StubProvider;

const ADDRESS: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

type TestHandler = RelayerOperationHandler<
    NonceManager<AtomicStoreStorage, StubProvider>,
    StubProvider,
    InMemoryOperationStore,
>;

fn request(operation_id: &str) -> RelayRequest {
    RelayRequest {
        address: ADDRESS.to_string(),
        chain_id: 1,
        to: Some(ADDRESS.to_string()),
        value: Some(1_000),
        data: None,
        max_fee_per_gas: None,
        max_priority_fee_per_gas: None,
        nonce: None,
        operation_id: Some(operation_id.to_string()),
    }
}

fn build_handler(provider: Arc<StubProvider>) -> (Arc<TestHandler>, Arc<InMemoryOperationStore>) {
    let store = Arc::new(InMemoryOperationStore::new());
    let nonce_manager = Arc::new(NonceManager::new(
        Arc::new(AtomicStoreStorage::new_in_memory()),
        provider.clone(),
    ));
    let handler = Arc::new(RelayerOperationHandler::new(
        nonce_manager,
        provider,
        Some(store.clone()),
    ));
    (handler, store)
}

#[tokio::test]
async fn test_relay_submits_and_confirms() {
    let provider = Arc::new(StubProvider::new(5, 5));
    let (handler, store) = build_handler(provider.clone());

    let response = handler.relay(request("op-1")).await.unwrap();
    assert_eq!(
        response,
        RelayerResponse::Pending {
            operation_id: "op-1".to_string()
        }
    );
    assert_eq!(provider.sent_nonces(), vec![5]);

    // The status check sees the successful receipt and advances the record.
    let record = handler.operation_status("op-1").await.unwrap();
    assert_eq!(record.status, OperationStatus::Confirmed);
    assert_eq!(
        store.get("op-1").await.unwrap().unwrap().status,
        OperationStatus::Confirmed
    );
}

#[tokio::test]
async fn test_sequential_relays_use_consecutive_nonces() {
    let provider = Arc::new(StubProvider::new(5, 5));
    let (handler, _store) = build_handler(provider.clone());

    for i in 0..3 {
        handler.relay(request(&format!("op-{}", i))).await.unwrap();
    }

    assert_eq!(provider.sent_nonces(), vec![5, 6, 7]);
}

#[tokio::test]
async fn test_replay_after_confirmation_returns_confirmed() {
    let provider = Arc::new(StubProvider::new(5, 5));
    let (handler, _store) = build_handler(provider.clone());

    handler.relay(request("op-1")).await.unwrap();
    handler.operation_status("op-1").await.unwrap();

    let response = handler.relay(request("op-1")).await.unwrap();
    match response {
        RelayerResponse::Confirmed {
            operation_id,
            nonce,
            block_number,
            ..
        } => {
            assert_eq!(operation_id, "op-1");
            assert_eq!(nonce, 5);
            assert_eq!(block_number, 1_001);
        }
        other => panic!("Expected confirmed replay, got {:?}", other),
    }
    // Replay never reaches the network again.
    assert_eq!(provider.sent_nonces(), vec![5]);
}

#[tokio::test]
async fn test_pending_response_resolves_through_polling() {
    let provider = Arc::new(StubProvider::new(5, 5));
    let (handler, _store) = build_handler(provider.clone());

    let response = handler.relay(request("op-1")).await.unwrap();
    let polling = PollingManager::new(handler.status_fetcher());

    let handle = ResponseHandle::new(response, provider).with_polling(polling);
    assert!(handle.can_wait());

    let options = PollingOptions {
        interval_ms: 10,
        timeout_ms: 5_000,
        ..PollingOptions::default()
    };
    let outcome = handle.wait(options).await.unwrap();
    assert_eq!(outcome.transaction_hash, "0xhash0005");
    assert!(outcome.receipt.unwrap().success);
}
