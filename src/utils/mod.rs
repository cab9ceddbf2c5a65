//! Common utilities and helper functions.

pub mod redis;
pub mod serde;
pub mod time;

pub use redis::*;
pub use time::*;
