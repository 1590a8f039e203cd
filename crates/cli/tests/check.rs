// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests for `chain check`

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

mod common;

use assert_cmd::Command;
use common::{module, TestEnv};
use predicates::prelude::*;

const STEPS: &str = r#"
[[step]]
name = "blur"
module = "smooth"
[step.params]
sigma = 2.5
mask = { ref = "MRHead" }

[[step]]
name = "segment"

[[link]]
from = "blur.output"
to = "segment.input"
kind = "volume"
"#;

fn plan() -> String {
    format!(
        "{}{}{}",
        module("smooth", "true"),
        module("segment", "true"),
        STEPS
    )
}

fn chain(env: &TestEnv) -> Command {
    let mut cmd = Command::cargo_bin("chain").unwrap();
    cmd.current_dir(env.path())
        .env("CHAIN_ARTIFACT_DIR", env.artifacts())
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn test_check_summarizes_plan() {
    let env = TestEnv::new();
    let path = env.write_plan(&plan());

    chain(&env)
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan OK: 2 steps, 1 links"))
        .stdout(predicate::str::contains(
            "0. blur (smooth) mask=@MRHead output=<volume> sigma=2.5",
        ))
        .stdout(predicate::str::contains("blur.output -> segment.input [volume]"));

    // Nothing is allocated by a check
    assert_eq!(env.leftover_artifacts(), 0);
}

#[test]
fn test_check_json_output() {
    let env = TestEnv::new();
    let path = env.write_plan(&plan());

    let output = chain(&env)
        .args(["check", "--format", "json"])
        .arg(&path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["steps"][1]["name"], "segment");
    assert_eq!(json["steps"][1]["params"]["input"], "<volume>");
    assert_eq!(json["links"][0]["kind"], "volume");
}

#[test]
fn test_check_rejects_backwards_link() {
    let env = TestEnv::new();
    let path = env.write_plan(&format!(
        "{}{}\n{}",
        module("a", "true"),
        module("b", "true"),
        r#"
[[step]]
name = "a"
[[step]]
name = "b"
[[link]]
from = "b.out"
to = "a.in"
kind = "volume"
"#
    ));

    chain(&env)
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "consuming step must come after the producing step",
        ));
}

#[test]
fn test_check_rejects_undefined_module() {
    let env = TestEnv::new();
    let path = env.write_plan("[[step]]\nname = \"ghost\"\n");

    chain(&env)
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("undefined module ghost"));
}
