// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancelling a run from outside the task driving it

use crate::backend::JobBackend;
use crate::error::PipelineError;
use crate::job::JobId;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct CancelState {
    /// Job of the step being started or executing
    job: Option<JobId>,
    requested: bool,
}

/// Cancel state shared by a pipeline and its handles
#[derive(Debug, Clone, Default)]
pub(crate) struct CancelSignal(Arc<Mutex<CancelState>>);

impl CancelSignal {
    fn lock(&self) -> MutexGuard<'_, CancelState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Forget the previous run
    pub(crate) fn reset(&self) {
        *self.lock() = CancelState::default();
    }

    pub(crate) fn is_requested(&self) -> bool {
        self.lock().requested
    }

    /// Record the job about to start. `false` if a cancel is already pending.
    pub(crate) fn arm(&self, job: &JobId) -> bool {
        let mut state = self.lock();
        state.job = Some(job.clone());
        !state.requested
    }

    pub(crate) fn disarm(&self) {
        self.lock().job = None;
    }

    /// Mark the run as cancelled; returns the job to stop, if any
    pub(crate) fn request(&self) -> Option<JobId> {
        let mut state = self.lock();
        state.requested = true;
        state.job.clone()
    }
}

/// Cancels the run of the pipeline it was taken from.
///
/// Usable from any task, including while a blocking `run` holds the
/// pipeline. The executing step is asked to stop and no later step starts.
/// A request only applies to the run in progress.
#[derive(Clone)]
pub struct CancelHandle<B: JobBackend> {
    backend: B,
    signal: CancelSignal,
}

impl<B: JobBackend> CancelHandle<B> {
    pub(crate) fn new(backend: B, signal: CancelSignal) -> Self {
        Self { backend, signal }
    }

    pub async fn cancel(&self) -> Result<(), PipelineError> {
        match self.signal.request() {
            Some(job) => {
                tracing::info!(job = %job, "cancelling step");
                self.backend.cancel(&job).await?;
            }
            None => tracing::debug!("cancel requested while no step is executing"),
        }
        Ok(())
    }
}
