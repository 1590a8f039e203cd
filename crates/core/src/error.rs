// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the pipeline

use crate::artifact::ArtifactKey;
use crate::backend::{BackendError, StoreError};
use crate::status::PipelineStatus;
use thiserror::Error;

/// Errors that can occur while configuring or running a pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline is already running (status: {status})")]
    AlreadyBusy { status: PipelineStatus },
    #[error("pipeline has no steps")]
    EmptyPipeline,
    #[error("step not found: {0}")]
    StepNotFound(usize),
    #[error("invalid artifact link {from} -> {to}: {reason}")]
    InvalidArtifactLink {
        from: ArtifactKey,
        to: ArtifactKey,
        reason: String,
    },
    #[error("step {step} completed with errors")]
    StepFailed { step: usize },
    #[error("step {step} was cancelled")]
    StepCancelled { step: usize },
    #[error("lost status notifications from step {step}")]
    Disconnected { step: usize },
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("artifact store error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// `EmptyPipeline` is reported, but the run still counts as completed.
    pub fn is_degenerate_success(&self) -> bool {
        matches!(self, PipelineError::EmptyPipeline)
    }
}
