//! Smoke tests for the `flow` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn flow() -> Command {
    let mut cmd = Command::cargo_bin("flow").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_commands() {
    flow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("host"))
        .stdout(predicate::str::contains("join"))
        .stdout(predicate::str::contains("init-config"));
}

#[test]
fn init_config_then_status_of_missing_session() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("flow.toml");
    let store = dir.path().join("sessions");

    flow()
        .args(["init-config", "--path"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    assert!(config.exists());

    flow()
        .arg("--config")
        .arg(&config)
        .arg("--store-dir")
        .arg(&store)
        .args(["status", "--code", "abc123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No session found for code ABC123"));
}

#[test]
fn status_prints_stored_record() {
    let dir = tempdir().unwrap();
    let record = r#"{
  "id": "ROOM42",
  "host_id": "6f1c2a1e-0000-4000-8000-000000000001",
  "timer": {
    "phase": "focus",
    "seconds_remaining": 1500,
    "running": false,
    "completed_cycles": 0,
    "deadline": null,
    "settings": {
      "focus_minutes": 25,
      "break_minutes": 5,
      "sessions_per_cycle": 4
    }
  },
  "members": [
    {
      "id": "6f1c2a1e-0000-4000-8000-000000000001",
      "name": "Ana",
      "is_host": true,
      "last_seen": 1000
    }
  ],
  "version": 1000
}"#;
    std::fs::write(dir.path().join("session_ROOM42.json"), record).unwrap();

    flow()
        .arg("--store-dir")
        .arg(dir.path())
        .args(["status", "--code", "ROOM42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Ana\""));
}

#[test]
fn bad_config_is_reported() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("flow.toml");
    std::fs::write(&config, "[timer]\nfocus_minutes = \"soon\"\n").unwrap();

    flow()
        .arg("--config")
        .arg(&config)
        .args(["status", "--code", "ABC123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
