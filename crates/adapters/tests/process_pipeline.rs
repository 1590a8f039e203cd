// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Integration tests running pipelines of real child processes.
//!
//! Modules are small `sh` scripts that read their `--name value` arguments.

use chain_adapters::{
    DirArtifactStore, ModuleCommand, ProcessJobBackend, TracedArtifactStore, TracedJobBackend,
};
use chain_core::{ArtifactKind, ArtifactStore, ParameterSet, Pipeline, PipelineError, Status};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Shell prelude turning `--name value` pairs into `$arg_name` variables
const PARSE_ARGS: &str = r#"while [ $# -gt 1 ]; do eval "arg_${1#--}=\"\$2\""; shift 2; done"#;

fn module(body: &str, cwd: &Path) -> ModuleCommand {
    ModuleCommand::shell(format!("{}\n{}", PARSE_ARGS, body)).current_dir(cwd)
}

fn setup(
    work: &Path,
    artifacts: &Path,
) -> Pipeline<TracedJobBackend<ProcessJobBackend>, TracedArtifactStore<DirArtifactStore>> {
    let backend = ProcessJobBackend::new()
        .with_module("produce", module(r#"echo "$arg_text" > "$arg_output""#, work))
        .with_module("upper", module(r#"tr a-z A-Z < "$arg_input" > "$arg_output""#, work))
        .with_module("collect", module(r#"cp "$arg_input" result.txt"#, work))
        .with_module(
            "slow-upper",
            module(
                r#"sleep 0.5; tr a-z A-Z < "$arg_input" > result.txt"#,
                work,
            ),
        )
        .with_module("fail", module("exit 2", work))
        .with_module("sleep", module("sleep 30", work));
    Pipeline::new(
        TracedJobBackend::new(backend),
        TracedArtifactStore::new(DirArtifactStore::new(artifacts)),
    )
}

#[tokio::test]
async fn artifacts_flow_between_processes() {
    let work = TempDir::new().unwrap();
    let artifacts = TempDir::new().unwrap();
    let mut pipeline = setup(work.path(), artifacts.path());

    pipeline
        .add_step("produce", ParameterSet::new().with("text", "hello"))
        .unwrap();
    pipeline.add_step("upper", ParameterSet::new()).unwrap();
    pipeline.add_step("collect", ParameterSet::new()).unwrap();
    pipeline
        .add_intermediate_node(0, "output", 1, "input", "text")
        .unwrap();
    pipeline
        .add_intermediate_node(1, "output", 2, "input", "text")
        .unwrap();

    pipeline.run(true).await.unwrap();

    assert_eq!(pipeline.status(), Status::Completed);
    let result = std::fs::read_to_string(work.path().join("result.txt")).unwrap();
    assert_eq!(result.trim(), "HELLO");

    // No intermediate file outlives the run
    let store = DirArtifactStore::new(artifacts.path());
    assert_eq!(
        store.count_by_kind(&ArtifactKind::new("text")).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn failing_process_ends_the_run() {
    let work = TempDir::new().unwrap();
    let artifacts = TempDir::new().unwrap();
    let mut pipeline = setup(work.path(), artifacts.path());

    pipeline
        .add_step("produce", ParameterSet::new().with("text", "x"))
        .unwrap();
    pipeline.add_step("fail", ParameterSet::new()).unwrap();
    pipeline.add_step("collect", ParameterSet::new()).unwrap();
    pipeline
        .add_intermediate_node(0, "output", 2, "input", "text")
        .unwrap();

    pipeline.run(false).await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(30), pipeline.wait())
        .await
        .unwrap();

    assert!(matches!(result, Err(PipelineError::StepFailed { step: 1 })));
    assert!(!pipeline.step(2).unwrap().has_started());
    assert!(!work.path().join("result.txt").exists());
    let store = DirArtifactStore::new(artifacts.path());
    assert_eq!(
        store.count_by_kind(&ArtifactKind::new("text")).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn cancel_stops_a_running_process() {
    let work = TempDir::new().unwrap();
    let artifacts = TempDir::new().unwrap();
    let mut pipeline = setup(work.path(), artifacts.path());
    pipeline.add_step("sleep", ParameterSet::new()).unwrap();
    pipeline.add_step("collect", ParameterSet::new()).unwrap();

    pipeline.run(false).await.unwrap();
    // Drive the run until the sleeping step is up
    while pipeline.step_status(0).unwrap() != Status::Running {
        let notification = tokio::time::timeout(Duration::from_secs(10), pipeline.recv())
            .await
            .unwrap()
            .unwrap();
        pipeline.dispatch(notification).await.unwrap();
    }

    pipeline.cancel().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(10), pipeline.wait())
        .await
        .unwrap();

    assert!(matches!(
        result,
        Err(PipelineError::StepCancelled { step: 0 })
    ));
    assert_eq!(pipeline.status(), Status::Cancelled);
    assert!(!pipeline.step(1).unwrap().has_started());
}

#[tokio::test]
async fn detached_consumer_reads_its_input_late() {
    let work = TempDir::new().unwrap();
    let artifacts = TempDir::new().unwrap();
    let mut pipeline = setup(work.path(), artifacts.path());

    pipeline
        .add_step("produce", ParameterSet::new().with("text", "late"))
        .unwrap();
    pipeline.add_step("slow-upper", ParameterSet::new()).unwrap();
    pipeline
        .add_intermediate_node(0, "output", 1, "input", "text")
        .unwrap();

    pipeline.run(false).await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(30), pipeline.wait())
        .await
        .unwrap();

    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(pipeline.status(), Status::Completed);
    let result = std::fs::read_to_string(work.path().join("result.txt")).unwrap();
    assert_eq!(result.trim(), "LATE");
    let store = DirArtifactStore::new(artifacts.path());
    assert_eq!(
        store.count_by_kind(&ArtifactKind::new("text")).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn cancel_handle_stops_a_blocking_run() {
    let work = TempDir::new().unwrap();
    let artifacts = TempDir::new().unwrap();
    let mut pipeline = setup(work.path(), artifacts.path());
    pipeline.add_step("sleep", ParameterSet::new()).unwrap();
    pipeline.add_step("collect", ParameterSet::new()).unwrap();

    let handle = pipeline.cancel_handle();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.cancel().await
    });

    tokio::time::timeout(Duration::from_secs(10), pipeline.run(true))
        .await
        .unwrap()
        .unwrap();
    canceller.await.unwrap().unwrap();

    assert_eq!(pipeline.status(), Status::Cancelled);
    assert!(matches!(
        pipeline.outcome(),
        Some(Err(PipelineError::StepCancelled { step: 0 }))
    ));
    assert!(!pipeline.step(1).unwrap().has_started());
}
