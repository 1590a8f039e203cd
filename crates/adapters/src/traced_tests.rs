// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chain_core::fake::{BackendCall, FakeArtifactStore, FakeJobBackend, StoreCall};
use chain_core::{ParamValue, Status};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

// =============================================================================
// Tracing output verification tests
// =============================================================================

#[test]
fn traced_backend_start_logs_entry_and_completion() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedJobBackend::new(FakeJobBackend::new());
        let job = traced.create(&JobDescriptor::from("smooth")).await.unwrap();
        traced
            .start(
                &job,
                &ParameterSet::new().with("sigma", 2.5),
                StartMode::Blocking,
            )
            .await
    });

    assert!(result.is_ok(), "start should succeed: {:?}", result);
    assert!(
        logs.contains("backend.start"),
        "Should log span name. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("starting"),
        "Should log entry message. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("elapsed_ms"),
        "Should log timing. Logs:\n{}",
        logs
    );
}

#[test]
fn traced_backend_warns_about_unresolved_parameters() {
    let (logs, _) = with_tracing(|| async {
        let traced = TracedJobBackend::new(FakeJobBackend::new());
        let job = traced.create(&JobDescriptor::from("segment")).await.unwrap();
        let mut params = ParameterSet::new().with("sigma", 1.0);
        params.set("input", ParamValue::Placeholder("volume".into()));
        traced.start(&job, &params, StartMode::Detached).await
    });

    assert!(
        logs.contains("unresolved artifact parameters"),
        "Should warn about placeholders. Logs:\n{}",
        logs
    );
}

#[test]
fn traced_backend_logs_create_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeJobBackend::new();
        fake.set_unknown_module("missing");
        let traced = TracedJobBackend::new(fake);
        traced.create(&JobDescriptor::from("missing")).await
    });

    assert!(result.is_err());
    assert!(
        logs.contains("create failed"),
        "Should log failure. Logs:\n{}",
        logs
    );
}

#[test]
fn traced_store_logs_allocate_and_free() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedArtifactStore::new(FakeArtifactStore::new());
        let spec = ArtifactSpec {
            kind: ArtifactKind::new("volume"),
            label: "step-0.out".to_string(),
            hidden: true,
        };
        let artifact = traced.allocate(&spec).await.unwrap();
        traced.free(&artifact).await
    });

    assert!(result.is_ok());
    assert!(
        logs.contains("store.allocate"),
        "Should log allocate span. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("step-0.out"),
        "Should log the label. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("artifact freed"),
        "Should log free completion. Logs:\n{}",
        logs
    );
}

// =============================================================================
// Delegation tests - verify traced wrapper delegates to inner adapter
// =============================================================================

#[tokio::test]
async fn traced_backend_delegates_to_inner() {
    let fake = FakeJobBackend::new();
    let traced = TracedJobBackend::new(fake.clone());

    let job = traced.create(&JobDescriptor::from("smooth")).await.unwrap();
    let sub = traced.subscribe(&job);
    traced
        .start(&job, &ParameterSet::new(), StartMode::Detached)
        .await
        .unwrap();
    traced.unsubscribe(&job, sub.id);

    assert_eq!(traced.status(&job).await.unwrap(), Status::Completed);
    let calls = fake.calls();
    assert!(matches!(
        &calls[0],
        BackendCall::Create { descriptor } if descriptor.as_str() == "smooth"
    ));
    assert!(matches!(&calls[1], BackendCall::Subscribe { .. }));
    assert!(matches!(
        &calls[2],
        BackendCall::Start {
            mode: StartMode::Detached,
            ..
        }
    ));
    assert!(matches!(&calls[3], BackendCall::Unsubscribe { .. }));
    assert_eq!(fake.subscriber_count(), 0);

    fake.set_input_release(InputRelease::OnCompleted);
    assert_eq!(traced.input_release(), InputRelease::OnCompleted);
}

#[tokio::test]
async fn traced_store_delegates_to_inner() {
    let fake = FakeArtifactStore::new();
    let traced = TracedArtifactStore::new(fake.clone());
    let spec = ArtifactSpec {
        kind: ArtifactKind::new("model"),
        label: "step-1.mesh".to_string(),
        hidden: true,
    };

    let artifact = traced.allocate(&spec).await.unwrap();

    assert!(fake.is_live(&artifact));
    assert_eq!(fake.calls(), vec![StoreCall::Allocate { spec }]);
    assert_eq!(
        traced.count_by_kind(&ArtifactKind::new("model")).await.unwrap(),
        1
    );
}
