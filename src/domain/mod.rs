//! Domain layer: relay request handling and waitable response handles.

pub mod handler;
pub mod response;

pub use handler::{RelayApi, RelayerOperationHandler};
pub use response::{ResponseHandle, WaitOutcome};

#[cfg(test)]
pub use handler::MockRelayApi;
