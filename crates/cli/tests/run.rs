// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests for `chain run`
//!
//! Plans use small `sh` modules that read `--name value` arguments.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

mod common;

use assert_cmd::Command;
use common::{module, TestEnv};
use predicates::prelude::*;
use std::fs;

fn chain(env: &TestEnv) -> Command {
    let mut cmd = Command::cargo_bin("chain").unwrap();
    cmd.current_dir(env.path())
        .env("CHAIN_ARTIFACT_DIR", env.artifacts())
        .env("RUST_LOG", "warn");
    cmd
}

fn three_step_plan() -> String {
    [
        module("produce", r#"echo "$arg_text" > "$arg_output""#),
        module("upper", r#"tr a-z A-Z < "$arg_input" > "$arg_output""#),
        module("collect", r#"cp "$arg_input" result.txt"#),
        r#"
[[step]]
name = "produce"
[step.params]
text = "hello chain"

[[step]]
name = "upper"

[[step]]
name = "collect"

[[link]]
from = "produce.output"
to = "upper.input"
kind = "text"

[[link]]
from = "upper.output"
to = "collect.input"
kind = "text"
"#
        .to_string(),
    ]
    .concat()
}

#[test]
fn test_chain_help() {
    Command::cargo_bin("chain")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chain runs modules"));
}

#[test]
fn test_run_passes_artifacts_between_steps() {
    let env = TestEnv::new();
    let plan = env.write_plan(&three_step_plan());

    chain(&env)
        .args(["run", "--wait"])
        .arg(&plan)
        .assert()
        .success()
        .stdout(predicate::str::contains("[2] collect: Completed"))
        .stdout(predicate::str::contains("Pipeline completed"));

    let result = fs::read_to_string(env.path().join("result.txt")).unwrap();
    assert_eq!(result.trim(), "HELLO CHAIN");
    assert_eq!(env.leftover_artifacts(), 0);
}

#[test]
fn test_run_reports_steps_in_order() {
    let env = TestEnv::new();
    let plan = env.write_plan(&three_step_plan());

    let output = chain(&env)
        .args(["run", "--wait"])
        .arg(&plan)
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    let first = stdout.find("[0] produce: Completed").unwrap();
    let second = stdout.find("[1] upper: Scheduled").unwrap();
    let third = stdout.find("[2] collect: Scheduled").unwrap();
    assert!(first < second && second < third, "stdout:\n{}", stdout);
}

#[test]
fn test_run_artifact_dir_flag_overrides_env() {
    let env = TestEnv::new();
    let plan = env.write_plan(&three_step_plan());
    let other = env.path().join("other-artifacts");

    chain(&env)
        .args(["run", "--wait", "--artifact-dir"])
        .arg(&other)
        .arg(&plan)
        .assert()
        .success();

    // The kind directory was created under the flag's directory
    assert!(other.join("text").is_dir());
    assert!(!env.artifacts().join("text").exists());
}

#[test]
fn test_failing_step_stops_the_pipeline() {
    let env = TestEnv::new();
    let plan = env.write_plan(&format!(
        "{}{}{}\n{}",
        module("ok", "true"),
        module("broken", "exit 4"),
        module("never", "touch never.txt"),
        r#"
[[step]]
name = "ok"
[[step]]
name = "broken"
[[step]]
name = "never"
"#
    ));

    chain(&env)
        .arg("run")
        .arg(&plan)
        .assert()
        .failure()
        .stdout(predicate::str::contains("[1] broken: CompletedWithErrors"))
        .stderr(predicate::str::contains("step 1 completed with errors"));

    assert!(!env.path().join("never.txt").exists());
}

#[test]
fn test_empty_plan_has_nothing_to_run() {
    let env = TestEnv::new();
    let plan = env.write_plan("");

    chain(&env)
        .arg("run")
        .arg(&plan)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to run"));
}

#[test]
fn test_missing_plan_file_fails() {
    let env = TestEnv::new();

    chain(&env)
        .args(["run", "missing.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}
