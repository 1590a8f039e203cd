// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! chain-core: Core library for the chain pipeline runner
//!
//! This crate provides:
//! - The `Pipeline` state machine that chains backend jobs step by step
//! - The artifact registry wiring step outputs to later step inputs
//! - Collaborator traits for job backends and artifact stores
//! - Status notification channels

pub mod artifact;
pub mod backend;
pub mod error;
pub mod events;
pub mod job;
pub mod params;
pub mod pipeline;
pub mod registry;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

// Re-exports
pub use artifact::{ArtifactKey, ArtifactKind, ArtifactLink, ArtifactRef, ArtifactSpec};
pub use backend::{ArtifactStore, BackendError, JobBackend, StoreError};
pub use error::PipelineError;
pub use events::{StatusBus, SubscriberId, Subscription};
pub use job::{InputRelease, JobDescriptor, JobId, StartMode, StatusChange};
pub use params::{ParamValue, ParameterSet};
pub use pipeline::{CancelHandle, Notification, ObserverRole, Pipeline, PipelineStep};
pub use registry::{ArtifactRegistry, Assignment};
pub use status::{JobStatus, PipelineStatus, Status, UnknownStatus};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeArtifactStore, FakeJobBackend};
