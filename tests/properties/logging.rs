//! Property-based tests for log file rolling.
//!
//! These verify that `rolled_file_path` always produces a well-formed
//! `.log` name carrying the date and sequence index, regardless of whether
//! the base path already ends in `.log`.

use proptest::{prelude::*, test_runner::Config};
use relayer_coordinator::logging::rolled_file_path;

proptest! {
  #![proptest_config(Config {
    cases: 1000, ..Config::default()
  })]

  #[test]
  fn prop_rolled_path_with_log_suffix(
    base in "[a-zA-Z0-9_/-]+",
    date in "[0-9]{4}-[0-9]{2}-[0-9]{2}",
    index in 0u32..1000
  ) {
      let base_with_log = format!("{}.log", base);
      let result = rolled_file_path(&base_with_log, &date, index);
      prop_assert_eq!(result, format!("{}-{}.{}.log", base, date, index));
  }

  #[test]
  fn prop_rolled_path_without_log_suffix(
    base in "[a-zA-Z0-9_/-]+",
    date in "[0-9]{4}-[0-9]{2}-[0-9]{2}",
    index in 0u32..1000
  ) {
      let result = rolled_file_path(&base, &date, index);
      prop_assert_eq!(result, format!("{}-{}.{}.log", base, date, index));
  }

  #[test]
  fn prop_rolled_path_is_always_a_log_file(
    base in "[a-zA-Z0-9_/.-]+",
    date in "[0-9]{4}-[0-9]{2}-[0-9]{2}",
    index in 0u32..1000
  ) {
      let result = rolled_file_path(&base, &date, index);
      prop_assert!(result.ends_with(".log"));
      prop_assert!(result.contains(&date));
  }
}
