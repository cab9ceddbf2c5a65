//! Property-based tests over pure helpers: log file rolling and retry
//! backoff bounds.

mod logging;
mod retry;
