mod error;
pub use error::*;

mod operation;
pub use operation::*;

mod relay;
pub use relay::*;

mod health;
pub use health::*;

mod rpc;
pub use rpc::*;

mod api_response;
pub use api_response::*;
