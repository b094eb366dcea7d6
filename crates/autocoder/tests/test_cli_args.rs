//! CLI argument parsing tests for autocoder

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn autocoder() -> Command {
    Command::new(env!("CARGO_BIN_EXE_autocoder"))
}

#[test]
fn test_help_flag() {
    autocoder()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("A local-model coding agent"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_version_flag() {
    autocoder()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_no_args_shows_usage() {
    autocoder()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_init_command_help() {
    autocoder()
        .args(["init", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialize"));
}

#[test]
fn test_run_command_help() {
    autocoder()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-t, --task"))
        .stdout(predicate::str::contains("--workspace"))
        .stdout(predicate::str::contains("--model"))
        .stdout(predicate::str::contains("--max-iterations"))
        .stdout(predicate::str::contains("--greedy"))
        .stdout(predicate::str::contains("-v, --verbose"));
}

#[test]
fn test_run_rejects_non_numeric_iterations() {
    autocoder()
        .args(["run", "-t", "x", "--max-iterations", "many"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_unknown_command() {
    autocoder()
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_history_show_requires_id() {
    autocoder()
        .args(["history", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<ID>"));
}
