// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake job backend and artifact store for testing
//!
//! Both fakes record every call. The job backend publishes a scripted list
//! of statuses synchronously from `start`, whatever the start mode, so tests
//! stay deterministic; tests push further transitions with
//! [`FakeJobBackend::emit`].
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::artifact::{ArtifactKind, ArtifactRef, ArtifactSpec};
use crate::backend::{ArtifactStore, BackendError, JobBackend, StoreError};
use crate::events::{StatusBus, SubscriberId, Subscription};
use crate::job::{InputRelease, JobDescriptor, JobId, StartMode, StatusChange};
use crate::params::ParameterSet;
use crate::status::{JobStatus, Status};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

// =============================================================================
// Job backend
// =============================================================================

/// Recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Create {
        descriptor: JobDescriptor,
    },
    Start {
        job: JobId,
        params: ParameterSet,
        mode: StartMode,
    },
    Status {
        job: JobId,
    },
    Cancel {
        job: JobId,
    },
    Subscribe {
        job: JobId,
    },
    Unsubscribe {
        job: JobId,
    },
}

/// Fake job state
#[derive(Debug, Clone)]
pub struct FakeJob {
    pub descriptor: JobDescriptor,
    pub status: JobStatus,
    pub params: Option<ParameterSet>,
    pub mode: Option<StartMode>,
}

#[derive(Default)]
struct FakeBackendState {
    calls: Vec<BackendCall>,
    jobs: BTreeMap<JobId, FakeJob>,
    /// Creation order
    created: Vec<JobId>,
    scripts: HashMap<JobDescriptor, Vec<JobStatus>>,
    unknown_modules: HashSet<JobDescriptor>,
    failing_starts: HashSet<JobDescriptor>,
    ignore_cancel: bool,
    input_release: InputRelease,
    next_id: u64,
}

/// Fake job backend with scripted status sequences
#[derive(Clone, Default)]
pub struct FakeJobBackend {
    state: Arc<Mutex<FakeBackendState>>,
    bus: StatusBus,
}

impl FakeJobBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence published by `start` when no script is set
    pub fn success_script() -> Vec<JobStatus> {
        vec![
            Status::Scheduled,
            Status::Running,
            Status::Completing,
            Status::Completed,
        ]
    }

    /// Sequence of a job that fails after it began running
    pub fn failure_script() -> Vec<JobStatus> {
        vec![
            Status::Scheduled,
            Status::Running,
            Status::CompletedWithErrors,
        ]
    }

    /// Sequence of a job that keeps running until cancelled or emitted
    pub fn hold_script() -> Vec<JobStatus> {
        vec![Status::Scheduled, Status::Running]
    }

    /// Statuses published when a job of this module starts
    pub fn set_script(&self, descriptor: impl Into<JobDescriptor>, script: Vec<JobStatus>) {
        self.lock().scripts.insert(descriptor.into(), script);
    }

    /// Make `create` reject a module
    pub fn set_unknown_module(&self, descriptor: impl Into<JobDescriptor>) {
        self.lock().unknown_modules.insert(descriptor.into());
    }

    /// Make `start` fail for jobs of a module
    pub fn set_start_fails(&self, descriptor: impl Into<JobDescriptor>) {
        self.lock().failing_starts.insert(descriptor.into());
    }

    /// Make `cancel` a recorded no-op
    pub fn set_ignore_cancel(&self, ignore: bool) {
        self.lock().ignore_cancel = ignore;
    }

    /// Report jobs as reading their inputs until `release`
    pub fn set_input_release(&self, release: InputRelease) {
        self.lock().input_release = release;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Jobs in creation order
    pub fn created_jobs(&self) -> Vec<JobId> {
        self.lock().created.clone()
    }

    /// Get a job by ID
    pub fn job(&self, id: &JobId) -> Option<FakeJob> {
        self.lock().jobs.get(id).cloned()
    }

    /// Modules started, in start order
    pub fn started_modules(&self) -> Vec<JobDescriptor> {
        let state = self.lock();
        state
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Start { job, .. } => state.jobs.get(job),
                _ => None,
            })
            .map(|fake| fake.descriptor.clone())
            .collect()
    }

    /// Live subscriptions held on the bus
    pub fn subscriber_count(&self) -> usize {
        self.bus.total_subscribers()
    }

    /// Publish a transition for a job, as the running process would
    pub fn emit(&self, job: &JobId, status: JobStatus) {
        let previous = {
            let mut state = self.lock();
            let Some(fake) = state.jobs.get_mut(job) else {
                return;
            };
            std::mem::replace(&mut fake.status, status)
        };
        self.bus
            .publish(StatusChange::new(job.clone(), previous, status));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeBackendState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl JobBackend for FakeJobBackend {
    async fn create(&self, descriptor: &JobDescriptor) -> Result<JobId, BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Create {
            descriptor: descriptor.clone(),
        });
        if state.unknown_modules.contains(descriptor) {
            return Err(BackendError::UnknownModule(descriptor.clone()));
        }

        state.next_id += 1;
        let id = JobId(format!("job-{}", state.next_id));
        state.jobs.insert(
            id.clone(),
            FakeJob {
                descriptor: descriptor.clone(),
                status: Status::Idle,
                params: None,
                mode: None,
            },
        );
        state.created.push(id.clone());
        Ok(id)
    }

    async fn start(
        &self,
        job: &JobId,
        params: &ParameterSet,
        mode: StartMode,
    ) -> Result<(), BackendError> {
        let script = {
            let mut state = self.lock();
            state.calls.push(BackendCall::Start {
                job: job.clone(),
                params: params.clone(),
                mode,
            });

            let descriptor = match state.jobs.get(job) {
                Some(fake) if fake.status.is_busy() => {
                    return Err(BackendError::InvalidState {
                        job: job.clone(),
                        status: fake.status,
                    })
                }
                Some(fake) => fake.descriptor.clone(),
                None => return Err(BackendError::JobNotFound(job.clone())),
            };
            if state.failing_starts.contains(&descriptor) {
                return Err(BackendError::LaunchFailed {
                    job: job.clone(),
                    reason: "scripted start failure".to_string(),
                });
            }

            if let Some(fake) = state.jobs.get_mut(job) {
                fake.params = Some(params.clone());
                fake.mode = Some(mode);
            }
            state
                .scripts
                .get(&descriptor)
                .cloned()
                .unwrap_or_else(Self::success_script)
        };

        for status in script {
            self.emit(job, status);
        }
        Ok(())
    }

    async fn status(&self, job: &JobId) -> Result<JobStatus, BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Status { job: job.clone() });
        state
            .jobs
            .get(job)
            .map(|fake| fake.status)
            .ok_or_else(|| BackendError::JobNotFound(job.clone()))
    }

    async fn cancel(&self, job: &JobId) -> Result<(), BackendError> {
        let honor = {
            let mut state = self.lock();
            state.calls.push(BackendCall::Cancel { job: job.clone() });
            let status = state
                .jobs
                .get(job)
                .map(|fake| fake.status)
                .ok_or_else(|| BackendError::JobNotFound(job.clone()))?;
            status.is_busy() && !state.ignore_cancel
        };

        if honor {
            self.emit(job, Status::Cancelling);
            self.emit(job, Status::Cancelled);
        }
        Ok(())
    }

    fn subscribe(&self, job: &JobId) -> Subscription {
        self.lock()
            .calls
            .push(BackendCall::Subscribe { job: job.clone() });
        self.bus.subscribe(job)
    }

    fn unsubscribe(&self, job: &JobId, id: SubscriberId) {
        self.lock()
            .calls
            .push(BackendCall::Unsubscribe { job: job.clone() });
        self.bus.unsubscribe(job, id);
    }

    fn input_release(&self) -> InputRelease {
        self.lock().input_release
    }
}

// =============================================================================
// Artifact store
// =============================================================================

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Allocate { spec: ArtifactSpec },
    Free { artifact: ArtifactRef },
}

/// Fake artifact state
#[derive(Debug, Clone)]
pub struct FakeArtifact {
    pub kind: ArtifactKind,
    pub label: String,
    pub hidden: bool,
}

#[derive(Default)]
struct FakeStoreState {
    calls: Vec<StoreCall>,
    live: BTreeMap<ArtifactRef, FakeArtifact>,
    next_id: u64,
    free_fails: bool,
}

/// Fake in-memory artifact store
#[derive(Clone, Default)]
pub struct FakeArtifactStore {
    state: Arc<Mutex<FakeStoreState>>,
}

impl FakeArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Add an object that exists before any pipeline runs
    pub fn insert_existing(&self, kind: impl Into<ArtifactKind>, label: &str) -> ArtifactRef {
        let mut state = self.lock();
        Self::insert(
            &mut state,
            FakeArtifact {
                kind: kind.into(),
                label: label.to_string(),
                hidden: false,
            },
        )
    }

    /// Get a live artifact
    pub fn get(&self, artifact: &ArtifactRef) -> Option<FakeArtifact> {
        self.lock().live.get(artifact).cloned()
    }

    pub fn is_live(&self, artifact: &ArtifactRef) -> bool {
        self.lock().live.contains_key(artifact)
    }

    /// Live artifacts of a kind shown in normal listings
    pub fn visible_count(&self, kind: &ArtifactKind) -> usize {
        self.lock()
            .live
            .values()
            .filter(|a| &a.kind == kind && !a.hidden)
            .count()
    }

    /// Make `free` fail (the artifact stays live)
    pub fn set_free_fails(&self, fails: bool) {
        self.lock().free_fails = fails;
    }

    fn insert(state: &mut FakeStoreState, artifact: FakeArtifact) -> ArtifactRef {
        state.next_id += 1;
        let id = ArtifactRef(format!("{}-{}", artifact.kind, state.next_id));
        state.live.insert(id.clone(), artifact);
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeStoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ArtifactStore for FakeArtifactStore {
    async fn allocate(&self, spec: &ArtifactSpec) -> Result<ArtifactRef, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Allocate { spec: spec.clone() });
        Ok(Self::insert(
            &mut state,
            FakeArtifact {
                kind: spec.kind.clone(),
                label: spec.label.clone(),
                hidden: spec.hidden,
            },
        ))
    }

    async fn free(&self, artifact: &ArtifactRef) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Free {
            artifact: artifact.clone(),
        });
        if state.free_fails {
            return Err(StoreError::Io(std::io::Error::other("scripted free failure")));
        }
        state
            .live
            .remove(artifact)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(artifact.clone()))
    }

    async fn count_by_kind(&self, kind: &ArtifactKind) -> Result<usize, StoreError> {
        Ok(self
            .lock()
            .live
            .values()
            .filter(|a| &a.kind == kind)
            .count())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
