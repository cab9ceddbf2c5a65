//! Property-based tests for retry backoff.
//!
//! The jittered exponential delay must stay within the documented envelope:
//! never above the cap plus jitter, never negative, and exactly zero when
//! delays are disabled.

use proptest::{prelude::*, test_runner::Config};
use relayer_coordinator::constants::RETRY_JITTER_PERCENT;
use relayer_coordinator::services::provider::calculate_retry_delay;

proptest! {
  #![proptest_config(Config {
    cases: 1000, ..Config::default()
  })]

  #[test]
  fn prop_delay_never_exceeds_cap_plus_jitter(
    attempt in 0u8..=255,
    base_delay_ms in 1u64..10_000,
    max_delay_ms in 1u64..1_000_000
  ) {
      let max_delay_ms = max_delay_ms.max(base_delay_ms);
      let delay = calculate_retry_delay(attempt, base_delay_ms, max_delay_ms);
      let ceiling = (max_delay_ms as f64 * (1.0 + RETRY_JITTER_PERCENT)).ceil() as u128;
      prop_assert!(delay.as_millis() <= ceiling);
  }

  #[test]
  fn prop_delay_stays_within_jitter_envelope(
    attempt in 0u8..20,
    base_delay_ms in 1u64..1_000,
    max_delay_ms in 1_000_000u64..2_000_000
  ) {
      let expected = base_delay_ms
          .saturating_mul(1u64.checked_shl(attempt as u32).unwrap_or(u64::MAX))
          .min(max_delay_ms);
      let delay = calculate_retry_delay(attempt, base_delay_ms, max_delay_ms);

      let floor = (expected as f64 * (1.0 - RETRY_JITTER_PERCENT)).floor() as u128;
      let ceiling = (expected as f64 * (1.0 + RETRY_JITTER_PERCENT)).ceil() as u128;
      prop_assert!((floor..=ceiling).contains(&delay.as_millis()));
  }

  #[test]
  fn prop_disabled_delays_are_zero(attempt in 0u8..=255, other in 0u64..10_000) {
      prop_assert_eq!(calculate_retry_delay(attempt, 0, other).as_millis(), 0);
      prop_assert_eq!(calculate_retry_delay(attempt, other, 0).as_millis(), 0);
  }
}
