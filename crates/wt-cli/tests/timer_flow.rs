//! End-to-end integration tests for the timer flow.
//!
//! Drives the built `wt` binary against a temp database:
//! salary add → start → heartbeat → stop → entries.

use std::process::{Command, Output};

use tempfile::TempDir;

fn wt_binary() -> String {
    env!("CARGO_BIN_EXE_wt").to_string()
}

fn wt(temp: &TempDir, args: &[&str]) -> Output {
    let db_path = temp.path().join("wt.db");
    Command::new(wt_binary())
        .env("HOME", temp.path())
        .env("WT_DATABASE_PATH", &db_path)
        .env("WT_USER", "tester")
        .args(args)
        .output()
        .expect("failed to run wt")
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_full_timer_flow_produces_earnings_fields() {
    let temp = TempDir::new().unwrap();

    let output = wt(
        &temp,
        &[
            "salary", "add", "--kind", "monthly", "--amount", "5000", "--from", "2020-01-01",
            "--hours-per-day", "8", "--days-per-month", "25",
        ],
    );
    assert_success(&output, "salary add");

    let output = wt(&temp, &["start", "--description", "integration run"]);
    assert_success(&output, "start");
    assert!(String::from_utf8_lossy(&output.stdout).contains("started entry"));

    let output = wt(&temp, &["heartbeat"]);
    assert_success(&output, "heartbeat");

    // Let some wall-clock time accumulate before stopping.
    std::thread::sleep(std::time::Duration::from_millis(1100));

    let output = wt(&temp, &["stop"]);
    assert_success(&output, "stop");
    let stdout = String::from_utf8_lossy(&output.stdout);
    // Rate comes from the salary record: 5000 / (8 * 25) = 25.00/h.
    assert!(stdout.contains("at 25.00/h"), "unexpected stop output: {stdout}");

    let output = wt(&temp, &["entries", "--json"]);
    assert_success(&output, "entries");
    let entries: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("entries --json should be valid JSON");
    let entry = &entries.as_array().unwrap()[0];
    assert_eq!(entry["user_id"], "tester");
    assert_eq!(entry["hourly_rate"], 25.0);
    assert!(entry["timer"]["accumulated_seconds"].as_i64().unwrap() >= 1);
}

#[test]
fn test_pause_without_start_fails() {
    let temp = TempDir::new().unwrap();
    let output = wt(&temp, &["pause"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no active timer"));
}

#[test]
fn test_rate_lookup_warns_on_empty_history() {
    let temp = TempDir::new().unwrap();
    let output = wt(&temp, &["rate", "--date", "2026-01-15", "--json"]);
    assert_success(&output, "rate");
    let lookup: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(lookup["hourlyRate"], 0.0);
    assert_eq!(lookup["source"], "zero");
    assert!(String::from_utf8_lossy(&output.stderr).contains("warning"));
}

#[test]
fn test_rate_lookup_uses_effective_record() {
    let temp = TempDir::new().unwrap();
    for (amount, from) in [("4000", "2025-01-01"), ("5000", "2026-01-01")] {
        let output = wt(
            &temp,
            &[
                "salary", "add", "--kind", "monthly", "--amount", amount, "--from", from,
                "--hours-per-day", "8", "--days-per-month", "25",
            ],
        );
        assert_success(&output, "salary add");
    }

    // 2025-06-01 falls under the first record: 4000 / 200 = 20.00/h.
    let output = wt(&temp, &["rate", "--date", "2025-06-01", "--json"]);
    assert_success(&output, "rate");
    let lookup: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(lookup["hourlyRate"], 20.0);
    assert_eq!(lookup["source"], "effective");
}
