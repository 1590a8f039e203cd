// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identity and status notifications

use crate::status::Status;
use serde::{Deserialize, Serialize};

/// What a step runs: a module or tool identity understood by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobDescriptor(pub String);

impl JobDescriptor {
    pub fn new(module: impl Into<String>) -> Self {
        Self(module.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobDescriptor {
    fn from(s: &str) -> Self {
        JobDescriptor(s.to_string())
    }
}

impl From<String> for JobDescriptor {
    fn from(s: String) -> Self {
        JobDescriptor(s)
    }
}

/// Handle to one job created by a backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// One status transition of a job, delivered to subscribers in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub job: JobId,
    pub previous: Status,
    pub status: Status,
}

impl StatusChange {
    pub fn new(job: JobId, previous: Status, status: Status) -> Self {
        Self {
            job,
            previous,
            status,
        }
    }
}

/// How a backend starts a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartMode {
    /// Return as soon as the job is launched
    Detached,
    /// Return once the job reached a terminal status
    Blocking,
}

impl StartMode {
    pub fn from_wait(wait_for_completion: bool) -> Self {
        if wait_for_completion {
            StartMode::Blocking
        } else {
            StartMode::Detached
        }
    }
}

/// When a job is done reading the artifacts handed to it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputRelease {
    /// Inputs are read before the job reports `Running`
    #[default]
    OnRunning,
    /// Inputs may be read until the job reports `Completed`
    OnCompleted,
}
