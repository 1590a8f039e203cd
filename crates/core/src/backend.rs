// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator traits: job backends and artifact stores

use crate::artifact::{ArtifactKind, ArtifactRef, ArtifactSpec};
use crate::events::{SubscriberId, Subscription};
use crate::job::{InputRelease, JobDescriptor, JobId, StartMode};
use crate::params::ParameterSet;
use crate::status::JobStatus;
use async_trait::async_trait;
use thiserror::Error;

// =============================================================================
// Job Backend
// =============================================================================

/// Errors from job backend operations
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("unknown module: {0}")]
    UnknownModule(JobDescriptor),
    #[error("job {job} cannot start from status {status}")]
    InvalidState { job: JobId, status: JobStatus },
    #[error("failed to launch {job}: {reason}")]
    LaunchFailed { job: JobId, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs jobs out of process and reports their status transitions.
///
/// Every transition of a job must be published to its subscribers exactly
/// once and in order. `start` in [`StartMode::Blocking`] returns only after
/// the job reached a terminal status; its transitions are already queued on
/// existing subscriptions by then.
#[async_trait]
pub trait JobBackend: Clone + Send + Sync + 'static {
    /// Create a job for a module. The job starts `Idle`.
    async fn create(&self, descriptor: &JobDescriptor) -> Result<JobId, BackendError>;

    /// Start a created job with resolved parameters
    async fn start(
        &self,
        job: &JobId,
        params: &ParameterSet,
        mode: StartMode,
    ) -> Result<(), BackendError>;

    /// Current status of a job
    async fn status(&self, job: &JobId) -> Result<JobStatus, BackendError>;

    /// Ask a job to stop. Cooperative: the job reports `Cancelling` and
    /// `Cancelled` when it honors the request.
    async fn cancel(&self, job: &JobId) -> Result<(), BackendError>;

    /// Subscribe to a job's status changes
    fn subscribe(&self, job: &JobId) -> Subscription;

    /// Drop a subscription created by [`JobBackend::subscribe`]
    fn unsubscribe(&self, job: &JobId, id: SubscriberId);

    /// Point after which a started job no longer reads its input artifacts
    fn input_release(&self) -> InputRelease {
        InputRelease::OnRunning
    }
}

// =============================================================================
// Artifact Store
// =============================================================================

/// Errors from artifact store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact not found: {0}")]
    NotFound(ArtifactRef),
    #[error("failed to allocate {kind} artifact: {reason}")]
    AllocationFailed { kind: ArtifactKind, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Allocates and frees data objects on command. Ownership stays with the
/// caller: the store never frees an artifact on its own.
#[async_trait]
pub trait ArtifactStore: Clone + Send + Sync + 'static {
    /// Allocate a new, empty artifact
    async fn allocate(&self, spec: &ArtifactSpec) -> Result<ArtifactRef, StoreError>;

    /// Destroy an artifact
    async fn free(&self, artifact: &ArtifactRef) -> Result<(), StoreError>;

    /// Number of live artifacts of a kind, hidden ones included
    async fn count_by_kind(&self, kind: &ArtifactKind) -> Result<usize, StoreError>;
}
