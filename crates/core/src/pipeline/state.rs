// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline state machine
//!
//! Chains steps so that step `i + 1` starts only once step `i` reported
//! `Completed`, and derives one aggregated status from three observers:
//!
//! - the **first** step mirrors `Scheduled`/`Running` while the run starts,
//! - the **last** step mirrors `Completing`/`Completed`,
//! - the **current** step mirrors `Cancelling`/`Cancelled`/`CompletedWithErrors`,
//!   which end the run whatever step is executing.
//!
//! Notifications are queued on per-job channels and handled when the caller
//! pumps them (`pump`, `wait`, or `recv` + `dispatch`).

use super::cancel::{CancelHandle, CancelSignal};
use super::observer::{Notification, ObserverRole, Observers};
use super::step::PipelineStep;
use crate::artifact::{ArtifactKey, ArtifactKind, ArtifactLink};
use crate::backend::{ArtifactStore, JobBackend};
use crate::error::PipelineError;
use crate::job::{InputRelease, JobDescriptor, StartMode, StatusChange};
use crate::params::ParameterSet;
use crate::registry::{ArtifactRegistry, Assignment};
use crate::status::{JobStatus, PipelineStatus, Status};
use tokio::sync::mpsc;

/// Called with (step index, status) for every change of the current step
pub type StepStatusCallback = Box<dyn FnMut(usize, JobStatus) + Send>;
/// Called with (step index, raw change) for every change of the current step
pub type StepEventCallback = Box<dyn FnMut(usize, &StatusChange) + Send>;

/// A sequential pipeline of backend jobs
pub struct Pipeline<B: JobBackend, S: ArtifactStore> {
    backend: B,
    store: S,
    steps: Vec<PipelineStep>,
    registry: ArtifactRegistry,
    status: PipelineStatus,
    /// A run is in progress; cleared on finalize
    active: bool,
    running: usize,
    mode: StartMode,
    observers: Observers,
    /// Step whose failure or cancellation ended the run
    ended_by: Option<usize>,
    cancel: CancelSignal,
    watchers: Vec<mpsc::UnboundedSender<PipelineStatus>>,
    on_step_status: Option<StepStatusCallback>,
    on_step_event: Option<StepEventCallback>,
}

impl<B: JobBackend, S: ArtifactStore> Pipeline<B, S> {
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            store,
            steps: Vec::new(),
            registry: ArtifactRegistry::new(),
            status: Status::Idle,
            active: false,
            running: 0,
            mode: StartMode::Detached,
            observers: Observers::new(),
            ended_by: None,
            cancel: CancelSignal::default(),
            watchers: Vec::new(),
            on_step_status: None,
            on_step_event: None,
        }
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Append a step; returns its index
    pub fn add_step(
        &mut self,
        descriptor: impl Into<JobDescriptor>,
        params: ParameterSet,
    ) -> Result<usize, PipelineError> {
        self.ensure_idle()?;
        let index = self.steps.len();
        self.steps
            .push(PipelineStep::new(index, descriptor.into(), params));
        Ok(index)
    }

    /// Replace a step's parameters. Artifact-linked parameters stay reserved.
    pub fn set_step_parameters(
        &mut self,
        index: usize,
        params: ParameterSet,
    ) -> Result<(), PipelineError> {
        let step = self
            .steps
            .get_mut(index)
            .ok_or(PipelineError::StepNotFound(index))?;
        step.params = params;
        let reserved = self.registry.reservations(index);
        self.apply(reserved);
        Ok(())
    }

    /// Link `from_step.from_param` (output) to `to_step.to_param` (input)
    /// through an intermediate artifact of `kind`.
    pub fn add_intermediate_node(
        &mut self,
        from_step: usize,
        from_param: &str,
        to_step: usize,
        to_param: &str,
        kind: impl Into<ArtifactKind>,
    ) -> Result<(), PipelineError> {
        self.ensure_idle()?;
        let link = ArtifactLink {
            from: ArtifactKey::new(from_step, from_param),
            to: ArtifactKey::new(to_step, to_param),
            kind: kind.into(),
        };
        let reserved = self.registry.declare(link, self.steps.len())?;
        self.apply(reserved);
        Ok(())
    }

    /// Register the per-step status callback
    pub fn on_step_status_changed(
        &mut self,
        callback: impl FnMut(usize, JobStatus) + Send + 'static,
    ) {
        self.on_step_status = Some(Box::new(callback));
    }

    /// Register the per-step raw event callback
    pub fn on_step_event(
        &mut self,
        callback: impl FnMut(usize, &StatusChange) + Send + 'static,
    ) {
        self.on_step_event = Some(Box::new(callback));
    }

    /// Receive every aggregated status transition from now on
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PipelineStatus> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers.push(tx);
        rx
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    /// Check if a run is in progress
    pub fn is_busy(&self) -> bool {
        self.active
    }

    pub fn step(&self, index: usize) -> Result<&PipelineStep, PipelineError> {
        self.steps
            .get(index)
            .ok_or(PipelineError::StepNotFound(index))
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Last status observed for a step in the current or last run
    pub fn step_status(&self, index: usize) -> Result<JobStatus, PipelineError> {
        self.step(index).map(|s| s.status)
    }

    /// Index of the executing step while a run is in progress
    pub fn running_step(&self) -> Option<usize> {
        self.active.then_some(self.running)
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle cancelling this pipeline's run from another task
    pub fn cancel_handle(&self) -> CancelHandle<B> {
        CancelHandle::new(self.backend.clone(), self.cancel.clone())
    }

    /// Result of a finished run: `None` while running or before any run
    pub fn outcome(&self) -> Option<Result<(), PipelineError>> {
        let step = self.ended_by.unwrap_or(self.running);
        match self.status {
            _ if self.active => None,
            Status::Completed => Some(Ok(())),
            Status::CompletedWithErrors => Some(Err(PipelineError::StepFailed { step })),
            Status::Cancelled => Some(Err(PipelineError::StepCancelled { step })),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Run control
    // -------------------------------------------------------------------------

    /// Start the pipeline from step 0.
    ///
    /// With `wait_for_completion` every step is started in blocking mode and
    /// all notifications are handled before returning. Otherwise the first
    /// step is launched and the caller drives the run with `pump`/`wait`.
    ///
    /// A pipeline without steps completes immediately and reports
    /// [`PipelineError::EmptyPipeline`].
    pub async fn run(&mut self, wait_for_completion: bool) -> Result<(), PipelineError> {
        if self.active {
            tracing::warn!(status = %self.status, "cannot start pipeline, it is already running");
            return Err(PipelineError::AlreadyBusy {
                status: self.status,
            });
        }
        if self.steps.is_empty() {
            tracing::warn!("cannot run pipeline, it has no steps");
            self.set_status(Status::Completed);
            return Err(PipelineError::EmptyPipeline);
        }

        let stale = self.registry.begin_run();
        if !stale.is_empty() {
            tracing::warn!(count = stale.len(), "artifacts left over from a previous run");
        }
        self.observers.clear(&self.backend);
        for step in &mut self.steps {
            step.reset();
        }
        self.set_status(Status::Idle);
        self.mode = StartMode::from_wait(wait_for_completion);
        self.ended_by = None;
        self.cancel.reset();
        self.running = 0;
        self.active = true;

        let last = self.steps.len() - 1;
        self.observers.watch(0, ObserverRole::First);
        self.observers.watch(last, ObserverRole::Last);

        tracing::info!(steps = self.steps.len(), mode = ?self.mode, "pipeline started");
        self.launch(0).await?;

        if self.mode == StartMode::Blocking {
            self.pump().await?;
        }
        Ok(())
    }

    /// Ask the executing step to stop. Later steps never start because the
    /// current one reports `Cancelled` instead of `Completed`.
    pub async fn cancel(&mut self) -> Result<(), PipelineError> {
        if !self.active {
            tracing::debug!("cancel ignored, pipeline is not running");
            return Ok(());
        }
        self.cancel_handle().cancel().await
    }

    /// Handle every notification already queued, without waiting.
    ///
    /// Returns the number of notifications handled.
    pub async fn pump(&mut self) -> Result<usize, PipelineError> {
        let mut handled = 0;
        while self.active {
            let Some(notification) = self.observers.try_next() else {
                break;
            };
            self.dispatch(notification).await?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Wait for the next notification. `None` once no run is in progress.
    ///
    /// Cancel-safe: dropping the future loses nothing.
    pub async fn recv(&mut self) -> Option<Notification> {
        if !self.active {
            return None;
        }
        if let Some(queued) = self.observers.try_next() {
            return Some(queued);
        }
        self.observers.next_from(self.running).await
    }

    /// Drive the run until it finishes; returns its outcome
    pub async fn wait(&mut self) -> Result<(), PipelineError> {
        while let Some(notification) = self.recv().await {
            self.dispatch(notification).await?;
        }
        self.outcome().unwrap_or(Ok(()))
    }

    /// Apply one notification to the state machine
    pub async fn dispatch(&mut self, notification: Notification) -> Result<(), PipelineError> {
        if !self.active {
            return Ok(());
        }
        let (step, change) = match notification {
            Notification::Changed { step, change } => (step, change),
            Notification::Lost { step } => {
                tracing::warn!(step, "status channel closed before the step finished");
                self.end_run(step, Status::CompletedWithErrors).await;
                return Err(PipelineError::Disconnected { step });
            }
        };

        let status = change.status;
        tracing::debug!(step, job = %change.job, from = %change.previous, to = %status, "step status changed");
        if let Some(s) = self.steps.get_mut(step) {
            s.status = status;
        }

        let current = self.observers.has(step, ObserverRole::Current);
        if current {
            if let Some(callback) = self.on_step_event.as_mut() {
                callback(step, &change);
            }
            if let Some(callback) = self.on_step_status.as_mut() {
                callback(step, status);
            }
        }

        if self.observers.has(step, ObserverRole::First)
            && matches!(status, Status::Scheduled | Status::Running)
        {
            self.set_status(status);
            if status == Status::Running {
                self.observers
                    .unwatch(step, ObserverRole::First, &self.backend);
            }
        }

        if self.observers.has(step, ObserverRole::Last)
            && matches!(status, Status::Completing | Status::Completed)
        {
            self.set_status(status);
            if status == Status::Completed {
                self.finalize().await;
                return Ok(());
            }
        }

        if !current {
            return Ok(());
        }

        match status {
            Status::Cancelling => self.set_status(status),
            Status::Cancelled | Status::CompletedWithErrors => {
                self.end_run(step, status).await;
            }
            Status::Running if self.backend.input_release() == InputRelease::OnRunning => {
                self.release_consumed(step).await;
            }
            Status::Completed => {
                self.observers
                    .unwatch(step, ObserverRole::Current, &self.backend);
                if self.backend.input_release() == InputRelease::OnCompleted {
                    self.release_consumed(step).await;
                }
                if step + 1 < self.steps.len() {
                    self.running = step + 1;
                    self.launch(step + 1).await?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Start a step; a backend or store failure ends the run
    async fn launch(&mut self, index: usize) -> Result<(), PipelineError> {
        if let Err(e) = self.start_step(index).await {
            tracing::error!(step = index, error = %e, "failed to start step");
            self.end_run(index, Status::CompletedWithErrors).await;
            return Err(e);
        }
        Ok(())
    }

    async fn start_step(&mut self, index: usize) -> Result<(), PipelineError> {
        if self.cancel.is_requested() {
            tracing::info!(step = index, "cancel requested, step not started");
            self.end_run(index, Status::Cancelled).await;
            return Ok(());
        }

        let created = self.registry.create_inputs_for(index, &self.store).await?;
        self.apply(created);

        let descriptor = self.steps[index].descriptor.clone();
        let job = self.backend.create(&descriptor).await?;
        // Subscribe before starting so no transition is missed
        let subscription = self.backend.subscribe(&job);
        self.steps[index].job = Some(job.clone());
        self.observers.watch(index, ObserverRole::Current);
        self.observers.attach(index, subscription, &self.backend);
        if !self.cancel.arm(&job) {
            // Requested while the job was being created
            self.backend.cancel(&job).await?;
        }

        let params = self.steps[index].params.clone();
        let unresolved = params.unresolved();
        if !unresolved.is_empty() {
            tracing::warn!(step = index, params = ?unresolved, "starting step with unresolved artifact parameters");
        }

        tracing::info!(step = index, module = %descriptor, job = %job, "running step");
        self.backend.start(&job, &params, self.mode).await?;
        Ok(())
    }

    /// Terminal failure or cancellation reported by (or for) `step`
    async fn end_run(&mut self, step: usize, status: Status) {
        self.ended_by = Some(step);
        self.set_status(status);
        self.finalize().await;
    }

    /// Unsubscribe everything and release every artifact
    async fn finalize(&mut self) {
        self.cancel.disarm();
        self.observers.clear(&self.backend);
        match self.registry.release_all(&self.store).await {
            Ok(reset) => self.apply(reset),
            Err(e) => tracing::warn!(error = %e, "failed to release artifacts"),
        }
        self.active = false;
        tracing::info!(status = %self.status, "pipeline finished");
    }

    /// Free the artifacts every consumer of which has started by `step`
    async fn release_consumed(&mut self, step: usize) {
        match self.registry.release_consumed_by(step, &self.store).await {
            Ok(reset) => self.apply(reset),
            Err(e) => tracing::warn!(step, error = %e, "failed to release artifacts"),
        }
    }

    fn set_status(&mut self, status: PipelineStatus) {
        if self.status == status {
            return;
        }
        tracing::debug!(from = %self.status, to = %status, "pipeline status");
        self.status = status;
        self.watchers.retain(|tx| tx.send(status).is_ok());
    }

    fn apply(&mut self, assignments: Vec<Assignment>) {
        for Assignment { key, value } in assignments {
            if let Some(step) = self.steps.get_mut(key.step) {
                step.params.set(key.param, value);
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), PipelineError> {
        if self.active {
            return Err(PipelineError::AlreadyBusy {
                status: self.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
