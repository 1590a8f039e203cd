// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline step definitions

use crate::job::{JobDescriptor, JobId};
use crate::params::ParameterSet;
use crate::status::{JobStatus, Status};

/// One unit of pipeline work
#[derive(Debug, Clone)]
pub struct PipelineStep {
    pub index: usize,
    pub descriptor: JobDescriptor,
    pub params: ParameterSet,
    /// Set once the step has been created on the backend
    pub job: Option<JobId>,
    /// Last status observed for this step in the current run
    pub status: JobStatus,
}

impl PipelineStep {
    pub fn new(index: usize, descriptor: JobDescriptor, params: ParameterSet) -> Self {
        Self {
            index,
            descriptor,
            params,
            job: None,
            status: Status::Idle,
        }
    }

    /// Check if the step got a job in the current run
    pub fn has_started(&self) -> bool {
        self.job.is_some()
    }

    /// Forget the previous run's job
    pub(crate) fn reset(&mut self) {
        self.job = None;
        self.status = Status::Idle;
    }
}
