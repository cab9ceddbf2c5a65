//! Integration tests exercising the public crate API end to end against
//! the in-memory store implementations and a stub chain provider.

mod logging;
mod nonce_coordination;
mod relay_lifecycle;
mod stub_provider;
