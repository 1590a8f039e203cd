// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job and pipeline status values

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status of a job, and of the pipeline that aggregates them.
///
/// Jobs move roughly `Idle → Scheduled → Running → Completing → Completed`,
/// with `Cancelling → Cancelled` and `CompletedWithErrors` as the exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Idle,
    Scheduled,
    Running,
    Completing,
    Completed,
    Cancelling,
    Cancelled,
    CompletedWithErrors,
}

/// Status reported by a single job
pub type JobStatus = Status;

/// Aggregated status of a pipeline
pub type PipelineStatus = Status;

impl Status {
    pub const ALL: [Status; 8] = [
        Status::Idle,
        Status::Scheduled,
        Status::Running,
        Status::Completing,
        Status::Completed,
        Status::Cancelling,
        Status::Cancelled,
        Status::CompletedWithErrors,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Status::Idle => "Idle",
            Status::Scheduled => "Scheduled",
            Status::Running => "Running",
            Status::Completing => "Completing",
            Status::Completed => "Completed",
            Status::Cancelling => "Cancelling",
            Status::Cancelled => "Cancelled",
            Status::CompletedWithErrors => "CompletedWithErrors",
        }
    }

    /// Check if this status ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Completed | Status::Cancelled | Status::CompletedWithErrors
        )
    }

    /// Busy means neither idle nor terminal; a busy pipeline refuses `run`.
    pub fn is_busy(&self) -> bool {
        !matches!(self, Status::Idle) && !self.is_terminal()
    }

    /// Check if this status ends a run without success
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Cancelled | Status::CompletedWithErrors)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown status name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .iter()
            .find(|status| status.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
