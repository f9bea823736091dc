//! CLI integration tests for the tether command-line interface.
//!
//! These tests cover argument parsing and the offline paths. None of them
//! need a running server: every command either only parses, or runs with
//! `--offline` against a cache in a temporary directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the tether binary.
fn tether() -> Command {
    Command::cargo_bin("tether").unwrap()
}

/// A tether command isolated to a temporary config and data directory.
fn isolated(dir: &TempDir) -> Command {
    let mut cmd = tether();
    cmd.current_dir(dir.path())
        .env("TETHER_CONFIG_DIR", dir.path().join("config"))
        .env("TETHER_DATA_DIR", dir.path().join("data"))
        .env_remove("TETHER_SERVER_URL")
        .env_remove("TETHER_TOKEN")
        .env_remove("TETHER_DIRECTORY");
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    tether()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("offline-first"));
}

#[test]
fn test_version_displays() {
    tether()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tether"));
}

#[test]
fn test_help_lists_subcommands() {
    tether()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("messages"))
        .stdout(predicate::str::contains("new"))
        .stdout(predicate::str::contains("rename"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("attach"))
        .stdout(predicate::str::contains("events"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn test_cache_help_lists_subcommands() {
    tether()
        .args(["cache", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stats"))
        .stdout(predicate::str::contains("sweep"))
        .stdout(predicate::str::contains("clear"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Validation Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_subcommand_fails() {
    tether()
        .arg("nonexistent")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_messages_requires_session_id() {
    tether()
        .arg("messages")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SESSION_ID"));
}

#[test]
fn test_rename_requires_title() {
    tether()
        .args(["rename", "ses_1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TITLE"));
}

#[test]
fn test_attach_rejects_bad_size() {
    tether()
        .args(["attach", "pty_1", "--size", "wide"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("COLSxROWS"));
}

#[test]
fn test_global_flags_accepted() {
    tether()
        .args(["--verbose", "--json", "--offline", "--server", "http://localhost:1", "--help"])
        .assert()
        .success();
}

// ─────────────────────────────────────────────────────────────────────────────
// Offline Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_offline_sessions_serves_empty_cache() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["--offline", "--json", "sessions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sessions\": []"))
        .stdout(predicate::str::contains("\"from_cache\": true"));
}

#[test]
fn test_offline_messages_are_empty() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["--offline", "--json", "messages", "ses_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"messages\": []"))
        .stdout(predicate::str::contains("\"is_complete\": false"));
}

#[test]
fn test_offline_create_fails() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["--offline", "new", "--title", "Later"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network unavailable"));
}

#[test]
fn test_cache_stats_on_empty_cache() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["--json", "cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"totalSize\": 0"))
        .stdout(predicate::str::contains("\"hits\": 0"));
}

#[test]
fn test_cache_sweep_then_clear() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["cache", "sweep"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Swept cache"));

    isolated(&dir)
        .args(["cache", "clear", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache cleared"));
}
