// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process job backend

use super::ModuleCommand;
use async_trait::async_trait;
use chain_core::{
    BackendError, InputRelease, JobBackend, JobDescriptor, JobId, JobStatus, ParameterSet,
    StartMode, Status, StatusBus, StatusChange, SubscriberId, Subscription,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::process::Child;
use tokio::sync::oneshot;
use uuid::Uuid;

struct ProcessJob {
    descriptor: JobDescriptor,
    status: JobStatus,
    /// Present while the child runs
    cancel: Option<oneshot::Sender<()>>,
    /// Cancel received before `start`
    cancel_pending: bool,
}

/// Runs each job as a child process of a registered module.
///
/// A job publishes `Scheduled` before the process is spawned and `Running`
/// once it is. Exit code 0 reports `Completing` then `Completed`; any other
/// exit reports `CompletedWithErrors`. Cancelling kills the child; a job
/// cancelled before it starts reports `Cancelled` from `start` without
/// spawning anything.
///
/// A child reads its input files whenever it likes, so inputs are only
/// released once it completed.
#[derive(Clone, Default)]
pub struct ProcessJobBackend {
    modules: Arc<HashMap<JobDescriptor, ModuleCommand>>,
    jobs: Arc<Mutex<HashMap<JobId, ProcessJob>>>,
    bus: StatusBus,
}

impl ProcessJobBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the command run for a module
    pub fn with_module(
        mut self,
        descriptor: impl Into<JobDescriptor>,
        command: ModuleCommand,
    ) -> Self {
        Arc::make_mut(&mut self.modules).insert(descriptor.into(), command);
        self
    }

    pub fn has_module(&self, descriptor: &JobDescriptor) -> bool {
        self.modules.contains_key(descriptor)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, ProcessJob>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record and publish a transition
    fn transition(&self, job: &JobId, status: JobStatus) {
        let previous = {
            let mut jobs = self.lock();
            let Some(entry) = jobs.get_mut(job) else {
                return;
            };
            if status.is_terminal() {
                entry.cancel = None;
            }
            std::mem::replace(&mut entry.status, status)
        };
        tracing::debug!(job = %job, from = %previous, to = %status, "job status");
        self.bus
            .publish(StatusChange::new(job.clone(), previous, status));
    }

    /// Wait for the child to exit or for a cancel request
    async fn supervise(self, job: JobId, mut child: Child, cancel: oneshot::Receiver<()>) {
        tokio::select! {
            exit = child.wait() => {
                match exit {
                    Ok(status) if status.success() => {
                        self.transition(&job, Status::Completing);
                        self.transition(&job, Status::Completed);
                    }
                    Ok(status) => {
                        tracing::warn!(job = %job, code = ?status.code(), "module exited with failure");
                        self.transition(&job, Status::CompletedWithErrors);
                    }
                    Err(e) => {
                        tracing::warn!(job = %job, error = %e, "failed to wait for module");
                        self.transition(&job, Status::CompletedWithErrors);
                    }
                }
            }
            Ok(()) = cancel => {
                self.transition(&job, Status::Cancelling);
                if let Err(e) = child.kill().await {
                    tracing::warn!(job = %job, error = %e, "failed to kill module");
                }
                self.transition(&job, Status::Cancelled);
            }
        }
    }
}

#[async_trait]
impl JobBackend for ProcessJobBackend {
    async fn create(&self, descriptor: &JobDescriptor) -> Result<JobId, BackendError> {
        if !self.has_module(descriptor) {
            return Err(BackendError::UnknownModule(descriptor.clone()));
        }
        let id = JobId(format!("{}-{}", descriptor, Uuid::new_v4()));
        self.lock().insert(
            id.clone(),
            ProcessJob {
                descriptor: descriptor.clone(),
                status: Status::Idle,
                cancel: None,
                cancel_pending: false,
            },
        );
        Ok(id)
    }

    async fn start(
        &self,
        job: &JobId,
        params: &ParameterSet,
        mode: StartMode,
    ) -> Result<(), BackendError> {
        let (command, cancelled) = {
            let jobs = self.lock();
            let entry = jobs
                .get(job)
                .ok_or_else(|| BackendError::JobNotFound(job.clone()))?;
            // A job runs at most once
            if entry.status != Status::Idle {
                return Err(BackendError::InvalidState {
                    job: job.clone(),
                    status: entry.status,
                });
            }
            let command = self
                .modules
                .get(&entry.descriptor)
                .cloned()
                .ok_or_else(|| BackendError::UnknownModule(entry.descriptor.clone()))?;
            (command, entry.cancel_pending)
        };
        if cancelled {
            tracing::debug!(job = %job, "job cancelled before start");
            self.transition(job, Status::Cancelled);
            return Ok(());
        }

        self.transition(job, Status::Scheduled);
        let child = match command.command(params).spawn() {
            Ok(child) => child,
            Err(e) => {
                self.transition(job, Status::CompletedWithErrors);
                return Err(BackendError::LaunchFailed {
                    job: job.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        let pending = match self.lock().get_mut(job) {
            Some(entry) if entry.cancel_pending => true,
            Some(entry) => {
                entry.cancel = tx.take();
                false
            }
            None => false,
        };
        self.transition(job, Status::Running);
        if let Some(tx) = tx.filter(|_| pending) {
            // Cancelled while spawning
            let _ = tx.send(());
        }

        let supervisor = self.clone().supervise(job.clone(), child, rx);
        match mode {
            StartMode::Blocking => supervisor.await,
            StartMode::Detached => {
                tokio::spawn(supervisor);
            }
        }
        Ok(())
    }

    async fn status(&self, job: &JobId) -> Result<JobStatus, BackendError> {
        self.lock()
            .get(job)
            .map(|entry| entry.status)
            .ok_or_else(|| BackendError::JobNotFound(job.clone()))
    }

    async fn cancel(&self, job: &JobId) -> Result<(), BackendError> {
        let sender = {
            let mut jobs = self.lock();
            let entry = jobs
                .get_mut(job)
                .ok_or_else(|| BackendError::JobNotFound(job.clone()))?;
            if !entry.status.is_terminal() {
                entry.cancel_pending = true;
            }
            entry.cancel.take()
        };
        match sender {
            Some(tx) => {
                // The supervisor may have just observed the exit
                let _ = tx.send(());
            }
            None => tracing::debug!(job = %job, "no running child to cancel"),
        }
        Ok(())
    }

    fn subscribe(&self, job: &JobId) -> Subscription {
        self.bus.subscribe(job)
    }

    fn unsubscribe(&self, job: &JobId, id: SubscriberId) {
        self.bus.unsubscribe(job, id);
    }

    fn input_release(&self) -> InputRelease {
        InputRelease::OnCompleted
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
