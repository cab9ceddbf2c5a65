//! # RPC Retry Module
//!
//! Retry mechanism for RPC calls with exponential backoff and randomized
//! jitter. Only errors the caller classifies as retriable are retried; the
//! attempt budget is fixed up front so termination is provable.
//!
//! ## Main Components
//!
//! - [`RetryConfig`]: Configuration parameters for retry behavior
//! - [`retry_rpc_call`]: Core function that drives the bounded retry loop
//! - [`calculate_retry_delay`]: Delay calculation with backoff and jitter

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::constants::RETRY_JITTER_PERCENT;

/// Calculate the retry delay using exponential backoff with jitter
///
/// # Arguments
/// * `attempt` - The retry attempt number (0 = first attempt)
/// * `base_delay_ms` - Base delay in milliseconds
/// * `max_delay_ms` - Maximum delay in milliseconds
///
/// # Returns
/// Duration to wait before the next retry
pub fn calculate_retry_delay(attempt: u8, base_delay_ms: u64, max_delay_ms: u64) -> Duration {
    if base_delay_ms == 0 || max_delay_ms == 0 {
        return Duration::from_millis(0);
    }

    // Limit the max delay to 2^63 to avoid overflow. (u64::MAX is 2^64 - 1)
    let exp_backoff = if attempt > 63 {
        max_delay_ms
    } else {
        let multiplier = 1u64.checked_shl(attempt as u32).unwrap_or(u64::MAX);
        base_delay_ms.saturating_mul(multiplier)
    };

    let delay_ms = exp_backoff.min(max_delay_ms);

    apply_jitter(delay_ms)
}

/// Applies jitter to a delay value based on RETRY_JITTER_PERCENT
///
/// The result is guaranteed to fall within
/// `[delay_ms × (1-RETRY_JITTER_PERCENT), delay_ms × (1+RETRY_JITTER_PERCENT)]`.
fn apply_jitter(delay_ms: u64) -> Duration {
    if delay_ms == 0 {
        return Duration::from_millis(0);
    }

    let jitter_range = (delay_ms as f64 * RETRY_JITTER_PERCENT).floor() as u64;

    if jitter_range == 0 {
        return Duration::from_millis(delay_ms);
    }

    let mut rng = rand::rng();
    let jitter_value = rng.random_range(0..=jitter_range);

    let final_delay = if rng.random_bool(0.5) {
        delay_ms.saturating_add(jitter_value)
    } else {
        delay_ms.saturating_sub(jitter_value)
    };

    Duration::from_millis(final_delay)
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per call
    pub max_retries: u8,
    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds for exponential backoff
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Create a new RetryConfig with specified values
    ///
    /// # Panics
    /// * If `max_delay_ms` < `base_delay_ms` when both are non-zero
    /// * If only one of the delay values is zero (both should be zero or both non-zero)
    pub fn new(max_retries: u8, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        if (base_delay_ms == 0) != (max_delay_ms == 0) {
            panic!(
                "Delay values must be consistent: both zero (no delays) or both non-zero. Got base_delay_ms={}, max_delay_ms={}",
                base_delay_ms, max_delay_ms
            );
        }

        if base_delay_ms > 0 && max_delay_ms > 0 && max_delay_ms < base_delay_ms {
            panic!(
                "max_delay_ms ({}) must be >= base_delay_ms ({}) when both are non-zero",
                max_delay_ms, base_delay_ms
            );
        }

        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Create a RetryConfig from environment variables
    pub fn from_env() -> Self {
        let config = ServerConfig::from_env();
        Self::new(
            config.provider_max_retries,
            config.provider_retry_base_delay_ms,
            config.provider_retry_max_delay_ms,
        )
    }
}

/// Retries `operation` up to `config.max_retries` times, sleeping a jittered
/// exponential backoff between attempts. Non-retriable errors return
/// immediately; the last error is returned once the budget is spent.
pub async fn retry_rpc_call<T, E, F, Fut>(
    operation_name: &str,
    is_retriable_error: impl Fn(&E) -> bool,
    operation: F,
    config: Option<RetryConfig>,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let config = config.unwrap_or_else(RetryConfig::from_env);
    let max_attempts = config.max_retries.max(1);

    log::debug!(
        "Starting RPC call '{}' with max_retries={}",
        operation_name,
        max_attempts
    );

    for attempt_idx in 0..max_attempts {
        match operation().await {
            Ok(result) => {
                log::debug!(
                    "RPC call '{}' succeeded (attempt {}/{})",
                    operation_name,
                    attempt_idx + 1,
                    max_attempts
                );
                return Ok(result);
            }
            Err(e) => {
                let is_retriable = is_retriable_error(&e);
                let is_last_attempt = attempt_idx + 1 >= max_attempts;

                log::warn!(
                    "RPC call '{}' failed (attempt {}/{}): {} [{}]",
                    operation_name,
                    attempt_idx + 1,
                    max_attempts,
                    e,
                    if is_retriable {
                        "retriable"
                    } else {
                        "non-retriable"
                    }
                );

                if !is_retriable || is_last_attempt {
                    return Err(e);
                }

                let delay = calculate_retry_delay(
                    attempt_idx + 1,
                    config.base_delay_ms,
                    config.max_delay_ms,
                );
                log::debug!(
                    "Retrying RPC call '{}' after {:?} delay (attempt {}/{})",
                    operation_name,
                    delay,
                    attempt_idx + 2,
                    max_attempts
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    unreachable!("The final attempt always returns; max_attempts is at least 1.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;
    use std::sync::atomic::{AtomicU8, Ordering as AtomicOrdering};
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct TestError(String);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "TestError: {}", self.0)
        }
    }

    #[test]
    fn test_calculate_retry_delay() {
        let base_delay_ms = 10;
        let max_delay_ms = 10000;

        let expected_backoffs = [
            10,  // 10 * 2^0
            20,  // 10 * 2^1
            40,  // 10 * 2^2
            80,  // 10 * 2^3
            160, // 10 * 2^4
            320, // 10 * 2^5
        ];

        for (i, expected) in expected_backoffs.iter().enumerate() {
            let attempt = i as u8;
            let delay = calculate_retry_delay(attempt, base_delay_ms, max_delay_ms);

            let min_expected = (*expected as f64 * (1.0 - RETRY_JITTER_PERCENT)).floor() as u128;
            let max_expected = (*expected as f64 * (1.0 + RETRY_JITTER_PERCENT)).ceil() as u128;

            assert!(
                (min_expected..=max_expected).contains(&delay.as_millis()),
                "Delay {} outside expected range {}..={}",
                delay.as_millis(),
                min_expected,
                max_expected
            );
        }

        // Max delay capping
        let delay = calculate_retry_delay(4, 100, 1000);
        let min_expected = (1000.0 * (1.0 - RETRY_JITTER_PERCENT)).floor() as u128;
        let max_expected = (1000.0 * (1.0 + RETRY_JITTER_PERCENT)).ceil() as u128;
        assert!((min_expected..=max_expected).contains(&delay.as_millis()));

        // Edge cases
        assert_eq!(calculate_retry_delay(5, 0, 1000).as_millis(), 0);
        assert_eq!(calculate_retry_delay(5, 100, 0).as_millis(), 0);
        assert_eq!(calculate_retry_delay(5, 0, 0).as_millis(), 0);

        // Max attempt (u8::MAX)
        let delay = calculate_retry_delay(u8::MAX, 1, 10_000);
        assert!(
            delay.as_millis() <= (10_000f64 * (1.0 + RETRY_JITTER_PERCENT)).ceil() as u128
        );
    }

    #[test]
    fn test_apply_jitter() {
        let base_delay = 1000;
        let jittered = apply_jitter(base_delay);

        let min_expected = (base_delay as f64 * (1.0 - RETRY_JITTER_PERCENT)).floor() as u64;
        let max_expected = (base_delay as f64 * (1.0 + RETRY_JITTER_PERCENT)).ceil() as u64;

        assert!(
            (min_expected as u128..=max_expected as u128).contains(&jittered.as_millis()),
            "Jittered value {} outside expected range {}..={}",
            jittered.as_millis(),
            min_expected,
            max_expected
        );

        assert_eq!(apply_jitter(0).as_millis(), 0);

        // Small values where the jitter range rounds down to zero
        for delay in 1..5 {
            let jittered = apply_jitter(delay);
            let jitter_range = (delay as f64 * RETRY_JITTER_PERCENT).floor() as u64;
            if jitter_range == 0 {
                assert_eq!(jittered.as_millis(), delay as u128);
            }
        }

        // Both directions of jitter should be observed over many samples
        let base_delay = 10000;
        let mut additions = 0;
        let mut subtractions = 0;
        for _ in 0..200 {
            let jittered = apply_jitter(base_delay);
            match jittered.as_millis().cmp(&(base_delay as u128)) {
                Ordering::Greater => additions += 1,
                Ordering::Less => subtractions += 1,
                Ordering::Equal => {}
            }
        }
        assert!(additions > 0, "No additions were observed");
        assert!(subtractions > 0, "No subtractions were observed");
    }

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::new(5, 100, 5000);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 100);
        assert_eq!(config.max_delay_ms, 5000);
    }

    #[test]
    #[should_panic(
        expected = "max_delay_ms (50) must be >= base_delay_ms (100) when both are non-zero"
    )]
    fn test_retry_config_validation_panic_delay_ordering() {
        let _config = RetryConfig::new(3, 100, 50);
    }

    #[test]
    #[should_panic(
        expected = "Delay values must be consistent: both zero (no delays) or both non-zero"
    )]
    fn test_retry_config_validation_panic_inconsistent_delays() {
        let _config = RetryConfig::new(3, 0, 1000);
    }

    #[tokio::test]
    async fn test_retry_rpc_call_success_first_attempt() {
        let config = RetryConfig::new(3, 0, 0);
        let result = retry_rpc_call(
            "test_operation",
            |_: &TestError| false,
            || async { Ok::<_, TestError>(42) },
            Some(config),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_rpc_call_recovers_within_budget() {
        let attempts = Arc::new(AtomicU8::new(0));
        let attempts_clone = attempts.clone();

        let config = RetryConfig::new(3, 0, 0);
        let result = retry_rpc_call(
            "test_operation",
            |_: &TestError| true,
            move || {
                let attempts = attempts_clone.clone();
                async move {
                    let current = attempts.fetch_add(1, AtomicOrdering::SeqCst);
                    if current < 2 {
                        Err(TestError("Retriable error".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            },
            Some(config),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(AtomicOrdering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_rpc_call_non_retriable_fails_immediately() {
        let attempts = Arc::new(AtomicU8::new(0));
        let attempts_clone = attempts.clone();

        let config = RetryConfig::new(3, 0, 0);
        let result: Result<i32, TestError> = retry_rpc_call(
            "test_operation",
            |_: &TestError| false,
            move || {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, AtomicOrdering::SeqCst);
                    Err(TestError("Non-retriable error".to_string()))
                }
            },
            Some(config),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_rpc_call_exhausts_budget() {
        let attempts = Arc::new(AtomicU8::new(0));
        let attempts_clone = attempts.clone();

        let config = RetryConfig::new(3, 0, 0);
        let result: Result<i32, TestError> = retry_rpc_call(
            "test_operation",
            |_: &TestError| true,
            move || {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, AtomicOrdering::SeqCst);
                    Err(TestError("Always fails".to_string()))
                }
            },
            Some(config),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(AtomicOrdering::SeqCst), 3);
    }
}
