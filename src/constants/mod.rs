mod nonce;
pub use nonce::*;

mod operation;
pub use operation::*;

mod retry;
pub use retry::*;

mod health;
pub use health::*;
