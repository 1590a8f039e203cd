// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Intermediate artifacts passed between steps
//!
//! An artifact is an opaque data object allocated by an [`ArtifactStore`]
//! and handed from one step's output parameter to later steps' inputs.
//! The pipeline never looks inside it.
//!
//! [`ArtifactStore`]: crate::backend::ArtifactStore

use serde::{Deserialize, Serialize};

/// Kind of data object, e.g. `"volume"` or `"model"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKind(pub String);

impl ArtifactKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ArtifactKind {
    fn from(s: &str) -> Self {
        ArtifactKind(s.to_string())
    }
}

/// Reference to a live artifact, as handed out by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactRef(pub String);

impl ArtifactRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ArtifactRef {
    fn from(s: &str) -> Self {
        ArtifactRef(s.to_string())
    }
}

/// A (step, parameter) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub step: usize,
    pub param: String,
}

impl ArtifactKey {
    pub fn new(step: usize, param: impl Into<String>) -> Self {
        Self {
            step,
            param: param.into(),
        }
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.step, self.param)
    }
}

/// Declares that `from`'s output parameter feeds `to`'s input parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLink {
    pub from: ArtifactKey,
    pub to: ArtifactKey,
    pub kind: ArtifactKind,
}

/// Allocation request sent to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub kind: ArtifactKind,
    /// Human-readable name, e.g. `"step-0.output"`
    pub label: String,
    /// Hidden artifacts are left out of normal listings
    pub hidden: bool,
}

impl ArtifactSpec {
    /// Spec for an intermediate artifact produced at `key`
    pub fn intermediate(kind: ArtifactKind, key: &ArtifactKey) -> Self {
        Self {
            kind,
            label: format!("step-{}.{}", key.step, key.param),
            hidden: true,
        }
    }
}
