//! Client-facing polling loop for in-flight operations.
//!
//! Converts an operation id into a terminal result by repeatedly fetching
//! its record through a status callback. Single cooperative loop: the
//! cancellation flag is checked at the top of every iteration and takes
//! effect within one sleep interval; the wall-clock timeout applies
//! regardless of status. Once resolved or rejected the loop never polls
//! again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use log::debug;
use tokio::time::{sleep, Duration, Instant};

use crate::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_TIMEOUT_MS};
use crate::models::{OperationRecord, OperationStatus, PollingError};

/// Fetches the current record for an operation id.
pub type StatusFetcher =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<OperationRecord, PollingError>> + Send + Sync>;

/// Invoked with every observed status, terminal ones included.
pub type StatusCallback = Arc<dyn Fn(&OperationRecord) + Send + Sync>;

#[derive(Clone)]
pub struct PollingOptions {
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub cancellation: Option<Arc<AtomicBool>>,
    pub on_status_update: Option<StatusCallback>,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            cancellation: None,
            on_status_update: None,
        }
    }
}

#[derive(Clone)]
pub struct PollingManager {
    fetcher: StatusFetcher,
}

impl PollingManager {
    pub fn new(fetcher: StatusFetcher) -> Self {
        Self { fetcher }
    }

    /// Polls until the operation reaches a terminal status, the timeout
    /// elapses, or the cancellation flag fires. Resolves immediately when
    /// the first fetch is already terminal.
    pub async fn start_polling(
        &self,
        operation_id: &str,
        options: PollingOptions,
    ) -> Result<OperationRecord, PollingError> {
        let started = Instant::now();
        let timeout = Duration::from_millis(options.timeout_ms);
        let interval = Duration::from_millis(options.interval_ms);

        loop {
            if let Some(cancellation) = &options.cancellation {
                if cancellation.load(Ordering::SeqCst) {
                    debug!("Polling for {} cancelled", operation_id);
                    return Err(PollingError::Cancelled);
                }
            }

            let elapsed = started.elapsed();
            if elapsed > timeout {
                return Err(PollingError::Timeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }

            let record = (self.fetcher)(operation_id.to_string()).await?;

            if let Some(on_status_update) = &options.on_status_update {
                on_status_update(&record);
            }

            match record.status {
                OperationStatus::Confirmed => return Ok(record),
                OperationStatus::Failed => {
                    return Err(PollingError::OperationFailed(
                        record.error.unwrap_or_else(|| "Operation failed".to_string()),
                    ))
                }
                _ => {
                    debug!(
                        "Operation {} still {:?}, sleeping {}ms",
                        operation_id, record.status, options.interval_ms
                    );
                    sleep(interval).await;
                }
            }
        }
    }
}
