//! CLI integration tests for bird-post

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CREDENTIAL_VARS: [&str; 4] = [
    "TWITTER_API_KEY",
    "TWITTER_API_SECRET",
    "TWITTER_ACCESS_TOKEN",
    "TWITTER_ACCESS_TOKEN_SECRET",
];

/// A command with no credentials and a config path that does not exist
fn unconfigured_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bird-post").unwrap();
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd.env("BIRDCAST_CONFIG", temp_dir.path().join("missing.toml"));
    cmd.current_dir(temp_dir.path());
    cmd
}

#[test]
fn test_help_flag_output() {
    let mut cmd = Command::cargo_bin("bird-post").unwrap();

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Publish a post to Twitter/X"))
        .stdout(predicate::str::contains("--media"))
        .stdout(predicate::str::contains("--status"))
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_version_flag_output() {
    let mut cmd = Command::cargo_bin("bird-post").unwrap();

    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bird-post"));
}

#[test]
fn test_not_configured_exits_with_code_2() {
    let temp_dir = TempDir::new().unwrap();

    unconfigured_cmd(&temp_dir)
        .arg("hello world")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Twitter not configured. Add API credentials to .env file.",
        ));
}

#[test]
fn test_empty_stdin_is_invalid_input() {
    let temp_dir = TempDir::new().unwrap();

    unconfigured_cmd(&temp_dir)
        .write_stdin("   \n")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Content cannot be empty"));
}

#[test]
fn test_empty_argument_is_invalid_input() {
    let temp_dir = TempDir::new().unwrap();

    unconfigured_cmd(&temp_dir).arg("").assert().code(3);
}

#[test]
fn test_status_not_configured_json() {
    let temp_dir = TempDir::new().unwrap();

    let output = unconfigured_cmd(&temp_dir)
        .args(["--status", "--format", "json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["connected"], false);
    assert_eq!(status["error"], "Twitter credentials not configured");
    assert_eq!(status["required_keys"].as_array().unwrap().len(), 4);
}

#[test]
fn test_status_not_configured_text() {
    let temp_dir = TempDir::new().unwrap();

    unconfigured_cmd(&temp_dir)
        .arg("--status")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Not connected"))
        .stdout(predicate::str::contains("TWITTER_API_KEY"));
}

#[test]
fn test_invalid_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[retry\nmax_attempts =").unwrap();

    unconfigured_cmd(&temp_dir)
        .arg("--config")
        .arg(&config_path)
        .arg("hello")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn test_invalid_format_rejected() {
    let temp_dir = TempDir::new().unwrap();

    unconfigured_cmd(&temp_dir)
        .args(["--format", "yaml", "hello"])
        .assert()
        .failure();
}
