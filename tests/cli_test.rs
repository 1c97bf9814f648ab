//! Integration tests for the vpsup binary.
//!
//! Nothing here runs `vpsup run` without `--dry-run`.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// The binary, run from an empty directory with no VPSUP_ variables.
fn vpsup(dir: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("vpsup"));
    cmd.current_dir(dir.path());
    for (key, _) in std::env::vars() {
        if key.starts_with("VPSUP_") {
            cmd.env_remove(key);
        }
    }
    cmd
}

fn write_config(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn help_lists_subcommands() {
    let temp = TempDir::new().unwrap();
    vpsup(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn version_flag() {
    let temp = TempDir::new().unwrap();
    vpsup(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn list_shows_steps_in_order() {
    let temp = TempDir::new().unwrap();
    vpsup(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_match("(?s)system-update.*create-user.*harden-ssh").unwrap());
}

#[test]
fn list_json_is_parseable() {
    let temp = TempDir::new().unwrap();
    let output = vpsup(&temp).args(["list", "--json"]).output().unwrap();

    assert!(output.status.success());
    let steps: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(steps.as_array().unwrap().len(), 16);
}

#[test]
fn config_reports_environment_over_file() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "custom.conf", "USERNAME=fromfile\nSSH_PORT=2222\n");

    vpsup(&temp)
        .args(["config", "--no-color", "--config"])
        .arg(&path)
        .env("VPSUP_USERNAME", "fromenv")
        .assert()
        .success()
        .stdout(predicate::str::contains("USERNAME=fromenv"))
        .stdout(predicate::str::contains("env VPSUP_USERNAME"))
        .stdout(predicate::str::contains("SSH_PORT=2222"))
        .stdout(predicate::str::contains("custom.conf"));
}

#[test]
fn config_discovers_local_override_file() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, "vpsup.conf", "INSTALL_DOCKER=false\n");

    vpsup(&temp)
        .args(["config", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vpsup.conf"))
        .stdout(predicate::str::contains("\"value\": false"));
}

#[test]
fn config_masks_secrets() {
    let temp = TempDir::new().unwrap();
    vpsup(&temp)
        .arg("config")
        .env("VPSUP_USER_PASSWORD", "hunter2")
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn invalid_value_exits_two() {
    let temp = TempDir::new().unwrap();
    vpsup(&temp)
        .arg("config")
        .env("VPSUP_SSH_PORT", "twenty-two")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SSH_PORT"));
}

#[test]
fn missing_explicit_config_exits_two() {
    let temp = TempDir::new().unwrap();
    vpsup(&temp)
        .args(["list", "--config", "does-not-exist.conf"])
        .assert()
        .code(2);
}

#[test]
fn dry_run_rejects_unknown_step() {
    let temp = TempDir::new().unwrap();
    vpsup(&temp)
        .args(["run", "--dry-run", "--only", "install-php"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("install-php"));
}

#[test]
fn dry_run_json_reports_selected_step() {
    let temp = TempDir::new().unwrap();
    vpsup(&temp)
        .args([
            "run",
            "--dry-run",
            "--non-interactive",
            "--only",
            "create-user",
            "--format",
            "json",
        ])
        .env("VPSUP_USERNAME", "vpsup-cli-test")
        .assert()
        .stdout(predicate::str::contains("\"dry_run\": true"))
        .stdout(predicate::str::contains("\"step_id\": \"create-user\""));
}

#[test]
fn completions_generate_for_bash() {
    let temp = TempDir::new().unwrap();
    vpsup(&temp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vpsup"));
}

#[test]
fn unknown_subcommand_fails() {
    let temp = TempDir::new().unwrap();
    vpsup(&temp).arg("provision-everything").assert().failure();
}
