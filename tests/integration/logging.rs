//! Integration tests for file logging.
//!
//! Environment variables used:
//! - LOG_MODE: "stdout" (default) or "file"
//! - LOG_LEVEL: log level ("trace", "debug", "info", "warn", "error"); default is "info"
//! - LOG_DATA_DIR: when using file mode, the directory of the log file
//!   Refer to `src/logging/mod.rs` for more details.

use chrono::Utc;
use lazy_static::lazy_static;
use relayer_coordinator::logging::{roll_for_size, rolled_file_path, setup_logging};
use std::{
    env, fs,
    fs::{create_dir_all, remove_dir_all},
    io::Write,
    path::Path,
    sync::Mutex,
    thread,
    time::Duration,
};
use tempfile::TempDir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

// The global logger can only be installed once per process.
lazy_static! {
    static ref INIT_LOGGING: () = {
        setup_logging();
    };
}

#[test]
#[should_panic(expected = "LOG_MAX_SIZE must be a valid u64 if set")]
fn test_invalid_log_max_size() {
    let _guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_log_dir = temp_dir.path().to_str().unwrap();

    env::set_var("LOG_MODE", "file");
    env::set_var("LOG_LEVEL", "debug");
    env::set_var("LOG_DATA_DIR", format!("{}/", temp_log_dir));
    env::set_var("LOG_MAX_SIZE", "invalid_value");

    setup_logging();
}

#[test]
fn test_setup_logging_file_mode_creates_log_file() {
    let _guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_log_dir = temp_dir.path().to_str().unwrap();

    env::remove_var("LOG_MAX_SIZE");
    env::set_var("LOG_MODE", "file");
    env::set_var("LOG_LEVEL", "debug");
    env::set_var("LOG_DATA_DIR", format!("{}/", temp_log_dir));

    let _ = remove_dir_all(temp_log_dir);
    create_dir_all(temp_log_dir).expect("Failed to create log directory");

    // Force the lazy_static to initialize logging.
    *INIT_LOGGING;

    // Sleep for the logger to flush.
    thread::sleep(Duration::from_millis(200));

    let date_str = Utc::now().format("%Y-%m-%d").to_string();
    let expected_path = {
        let base = format!("{}/coordinator.log", temp_log_dir);
        rolled_file_path(&base, &date_str, 1)
    };

    assert!(
        Path::new(&expected_path).exists(),
        "Expected log file {} does not exist",
        expected_path
    );
}

#[test]
fn test_oversized_log_file_rolls_to_next_index() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let base_file = temp_dir.path().join("coordinator.log");
    let base_path = base_file.to_str().unwrap();

    let date_str = Utc::now().format("%Y-%m-%d").to_string();
    let dated_path = rolled_file_path(base_path, &date_str, 1);

    let mut file = fs::File::create(&dated_path).expect("Failed to create test log file");
    file.write_all(&[0; 64])
        .expect("Failed to write to test log file");

    let max_size = 10; // bytes
    let final_path = roll_for_size(&dated_path, base_path, &date_str, max_size);

    assert_ne!(
        final_path, dated_path,
        "Expected rolled log file path to differ from the oversized file"
    );
    assert!(
        final_path.contains("coordinator-"),
        "Expected rolled log file path to contain 'coordinator-'"
    );
}

#[test]
fn test_roll_for_size_returns_original_when_under_max_size() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let base_file = temp_dir.path().join("coordinator.log");
    let base_path = base_file.to_str().unwrap();

    let date_str = Utc::now().format("%Y-%m-%d").to_string();
    let dated_path = rolled_file_path(base_path, &date_str, 1);

    let mut file = fs::File::create(&dated_path).expect("Failed to create test log file");
    write!(file, "small file").expect("Failed to write to test log file");

    let final_path = roll_for_size(&dated_path, base_path, &date_str, 10_000);
    assert_eq!(
        final_path, dated_path,
        "roll_for_size should return the original file path when within size threshold"
    );
}
