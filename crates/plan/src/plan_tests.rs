// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parse_plan;
use chain_core::fake::{BackendCall, FakeArtifactStore, FakeJobBackend};
use chain_core::{ParamValue, Status};
use yare::parameterized;

const MODULES: &str = r#"
[module.a]
run = "true"
[module.b]
run = "true"
[module.c]
run = "true"
"#;

fn plan(body: &str) -> Plan {
    parse_plan(&format!("{}\n{}", MODULES, body)).unwrap()
}

#[parameterized(
    duplicate_step = {
        "[[step]]\nname = \"a\"\n[[step]]\nname = \"a\"",
        "duplicate step name: a"
    },
    unknown_module = {
        "[[step]]\nname = \"x\"\nmodule = \"nope\"",
        "step x uses undefined module nope"
    },
    unknown_link_step = {
        "[[step]]\nname = \"a\"\n[[link]]\nfrom = \"a.out\"\nto = \"z.in\"\nkind = \"volume\"",
        "link references undefined step: z"
    },
    backwards_link = {
        "[[step]]\nname = \"a\"\n[[step]]\nname = \"b\"\n[[link]]\nfrom = \"b.out\"\nto = \"a.in\"\nkind = \"volume\"",
        "consuming step must come after the producing step"
    },
    doubly_fed_input = {
        "[[step]]\nname = \"a\"\n[[step]]\nname = \"b\"\n[[step]]\nname = \"c\"\n[[link]]\nfrom = \"a.out\"\nto = \"c.in\"\nkind = \"volume\"\n[[link]]\nfrom = \"b.out\"\nto = \"c.in\"\nkind = \"volume\"",
        "c.in is already fed by a.out"
    },
)]
fn validation_errors(body: &str, message: &str) {
    let err = plan(body).validate().unwrap_err();
    assert!(
        err.to_string().contains(message),
        "expected {:?} in {:?}",
        message,
        err.to_string()
    );
}

#[test]
fn module_needs_run_or_command() {
    let plan = parse_plan("[module.a]\ncwd = \"/tmp\"\n[[step]]\nname = \"a\"").unwrap();
    assert!(matches!(plan.validate(), Err(PlanError::InvalidFormat(_))));
}

#[tokio::test]
async fn apply_builds_a_runnable_pipeline() {
    let plan = plan(
        r#"
[[step]]
name = "a"
[step.params]
sigma = 1.5
[[step]]
name = "b"
[[step]]
name = "c"
[[link]]
from = "a.out"
to = "c.in"
kind = "volume"
"#,
    );
    let backend = FakeJobBackend::new();
    let mut pipeline = Pipeline::new(backend.clone(), FakeArtifactStore::new());

    plan.apply(&mut pipeline).unwrap();

    assert_eq!(pipeline.step_count(), 3);
    assert_eq!(pipeline.registry().links().len(), 1);
    assert_eq!(
        pipeline.step(2).unwrap().params.get("in"),
        Some(&ParamValue::Placeholder("volume".into()))
    );

    pipeline.run(true).await.unwrap();
    assert_eq!(pipeline.status(), Status::Completed);
    let started: Vec<String> = backend
        .started_modules()
        .iter()
        .map(|m| m.to_string())
        .collect();
    assert_eq!(started, vec!["a", "b", "c"]);
    let first_start = backend
        .calls()
        .into_iter()
        .find_map(|call| match call {
            BackendCall::Start { params, .. } => Some(params),
            _ => None,
        })
        .unwrap();
    assert_eq!(first_start.get("sigma"), Some(&ParamValue::Literal("1.5".into())));
}

#[test]
fn invalid_plan_leaves_pipeline_untouched() {
    let plan = plan("[[step]]\nname = \"a\"\n[[step]]\nname = \"a\"");
    let mut pipeline = Pipeline::new(FakeJobBackend::new(), FakeArtifactStore::new());

    assert!(plan.apply(&mut pipeline).is_err());
    assert_eq!(pipeline.step_count(), 0);
}

#[test]
fn endpoint_parsing() {
    assert_eq!(
        Endpoint::parse("blur.output"),
        Some(Endpoint {
            step: "blur".to_string(),
            param: "output".to_string(),
        })
    );
    assert_eq!(Endpoint::parse("blur"), None);
    assert_eq!(Endpoint::parse(".output"), None);
    assert_eq!(Endpoint::parse("blur."), None);
}
