// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use async_trait::async_trait;
use chain_core::{
    ArtifactKind, ArtifactRef, ArtifactSpec, ArtifactStore, BackendError, InputRelease,
    JobBackend, JobDescriptor, JobId, JobStatus, ParameterSet, StartMode, StoreError,
    SubscriberId, Subscription,
};
use tracing::Instrument;

/// Wrapper that adds tracing to any JobBackend
#[derive(Clone)]
pub struct TracedJobBackend<B> {
    inner: B,
}

impl<B> TracedJobBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: JobBackend> JobBackend for TracedJobBackend<B> {
    async fn create(&self, descriptor: &JobDescriptor) -> Result<JobId, BackendError> {
        let span = tracing::info_span!("backend.create", module = %descriptor);
        async {
            let result = self.inner.create(descriptor).await;
            match &result {
                Ok(job) => tracing::debug!(job = %job, "job created"),
                Err(e) => tracing::error!(error = %e, "create failed"),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn start(
        &self,
        job: &JobId,
        params: &ParameterSet,
        mode: StartMode,
    ) -> Result<(), BackendError> {
        let span = tracing::info_span!("backend.start", job = %job, mode = ?mode);
        async {
            tracing::info!(param_count = params.len(), "starting");

            // Placeholders are left out of the rendered arguments
            let unresolved = params.unresolved();
            if !unresolved.is_empty() {
                tracing::warn!(params = ?unresolved, "unresolved artifact parameters are omitted");
            }

            let start = std::time::Instant::now();
            let result = self.inner.start(job, params, mode).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "started"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "start failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn status(&self, job: &JobId) -> Result<JobStatus, BackendError> {
        let result = self.inner.status(job).await;
        tracing::trace!(job = %job, status = ?result.as_ref().ok(), "checked");
        result
    }

    async fn cancel(&self, job: &JobId) -> Result<(), BackendError> {
        let span = tracing::info_span!("backend.cancel", job = %job);
        async {
            let result = self.inner.cancel(job).await;
            match &result {
                Ok(()) => tracing::info!("cancel requested"),
                Err(e) => tracing::warn!(error = %e, "cancel failed"),
            }

            result
        }
        .instrument(span)
        .await
    }

    fn subscribe(&self, job: &JobId) -> Subscription {
        let subscription = self.inner.subscribe(job);
        tracing::trace!(job = %job, subscriber = %subscription.id, "subscribed");
        subscription
    }

    fn unsubscribe(&self, job: &JobId, id: SubscriberId) {
        tracing::trace!(job = %job, subscriber = %id, "unsubscribed");
        self.inner.unsubscribe(job, id);
    }

    fn input_release(&self) -> InputRelease {
        self.inner.input_release()
    }
}

/// Wrapper that adds tracing to any ArtifactStore
#[derive(Clone)]
pub struct TracedArtifactStore<S> {
    inner: S,
}

impl<S> TracedArtifactStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ArtifactStore> ArtifactStore for TracedArtifactStore<S> {
    async fn allocate(&self, spec: &ArtifactSpec) -> Result<ArtifactRef, StoreError> {
        let span = tracing::info_span!("store.allocate", kind = %spec.kind, label = %spec.label);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.allocate(spec).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(artifact) => tracing::info!(
                    artifact = %artifact,
                    hidden = spec.hidden,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "artifact allocated"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "allocate failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn free(&self, artifact: &ArtifactRef) -> Result<(), StoreError> {
        let span = tracing::info_span!("store.free", artifact = %artifact);
        async {
            let result = self.inner.free(artifact).await;
            match &result {
                Ok(()) => tracing::info!("artifact freed"),
                Err(e) => tracing::warn!(error = %e, "free failed"),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn count_by_kind(&self, kind: &ArtifactKind) -> Result<usize, StoreError> {
        let result = self.inner.count_by_kind(kind).await;
        tracing::trace!(kind = %kind, count = ?result.as_ref().ok(), "counted");
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
