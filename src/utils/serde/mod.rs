//! Serde helpers for wire and persistence formats.

mod u128_string;
pub use u128_string::*;
