//! Integration tests for `tuningtron devices` and top-level behavior.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tuningtron(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tuningtron-cli").unwrap();
    cmd.current_dir(temp_dir.path()).env("HOME", temp_dir.path());
    cmd
}

#[test]
fn test_devices_requires_visible_devices_env() {
    let temp_dir = TempDir::new().unwrap();

    tuningtron(&temp_dir)
        .env_remove("CUDA_VISIBLE_DEVICES")
        .arg("devices")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CUDA_VISIBLE_DEVICES"));
}

#[test]
fn test_devices_with_no_visible_gpu() {
    let temp_dir = TempDir::new().unwrap();

    tuningtron(&temp_dir)
        .env("CUDA_VISIBLE_DEVICES", "")
        .arg("devices")
        .assert()
        .success()
        .stdout(predicate::str::contains("No CUDA devices visible"));
}

#[test]
fn test_devices_json() {
    let temp_dir = TempDir::new().unwrap();

    let assert = tuningtron(&temp_dir).env("CUDA_VISIBLE_DEVICES", "").arg("devices").arg("--json").assert().success();
    let profile: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(profile["accelerator"], serde_json::Value::Null);
    assert_eq!(profile["visible_devices"], "");
}

#[test]
fn test_no_command_prints_help() {
    let temp_dir = TempDir::new().unwrap();

    tuningtron(&temp_dir).assert().success().stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_broken_config_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("tuningtron.toml"), "distributed = \"sometimes\"").unwrap();

    tuningtron(&temp_dir)
        .arg("jobs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("tuningtron.toml"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let temp_dir = TempDir::new().unwrap();

    tuningtron(&temp_dir)
        .arg("--config")
        .arg("nope.toml")
        .arg("jobs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}
