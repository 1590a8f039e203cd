// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status notification channels
//!
//! This module provides:
//! - `StatusBus` - Route job status changes to per-job subscribers
//! - `Subscription` - A typed receiver bound to one job, dropped to detach

mod bus;
mod subscription;

pub use bus::{StatusBus, StatusReceiver, StatusSender};
pub use subscription::{Disconnected, SubscriberId, Subscription};
