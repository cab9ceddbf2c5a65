mod api;
pub use api::*;

mod store;
pub use store::*;

mod provider;
pub use provider::*;

mod nonce;
pub use nonce::*;

mod handler;
pub use handler::*;

mod polling;
pub use polling::*;
