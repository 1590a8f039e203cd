// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline state machine

mod cancel;
mod observer;
mod state;
mod step;

pub use cancel::CancelHandle;
pub use observer::{Notification, ObserverRole};
pub use state::{Pipeline, StepEventCallback, StepStatusCallback};
pub use step::PipelineStep;
