//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use std::process::{Command, Output};
use std::time::Duration as StdDuration;
use trellis::config::StoreConfig;
use trellis::domain::Record;
use trellis::store::RecordStore;

/// Run the trellis binary in `dir` with colors off.
pub fn run_trellis_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trellis"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute trellis")
}

/// Run trellis with `--json` and parse stdout.
pub fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = args.to_vec();
    full.push("--json");
    let output = run_trellis_in_dir(dir, &full);
    assert!(
        output.status.success(),
        "trellis {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

/// Create a record through the CLI and return its id.
pub fn create_record(dir: &Path, extra: &[&str]) -> String {
    let mut args = vec!["create"];
    args.extend_from_slice(extra);
    let created = run_json(dir, &args);
    created["id"].as_str().expect("id missing").to_string()
}

/// Store config for `dir` with a short retry budget so lock tests finish fast.
pub fn fast_config(dir: &Path) -> StoreConfig {
    StoreConfig {
        lock_timeout: StdDuration::from_secs(30),
        max_retries: 5,
        retry_delay: StdDuration::from_millis(10),
        ..StoreConfig::new(dir)
    }
}

/// Store over `dir` using [`fast_config`].
pub fn store_in(dir: &Path) -> RecordStore {
    RecordStore::new(fast_config(dir))
}

/// A record created and updated `days_ago` days before now.
pub fn record_aged(id: &str, title: &str, days_ago: i64) -> Record {
    let at: DateTime<Utc> = Utc::now() - Duration::days(days_ago);
    let mut record = Record::new(id, title);
    record.created_at = at;
    record.updated_at = at;
    record
}
