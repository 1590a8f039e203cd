// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job status subscriptions

use super::bus::StatusReceiver;
use crate::job::{JobId, StatusChange};
use tokio::sync::mpsc::error::TryRecvError;

/// Subscriber handle for unsubscribing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A live subscription to one job's status changes
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub job: JobId,
    rx: StatusReceiver,
}

impl Subscription {
    pub fn new(id: SubscriberId, job: JobId, rx: StatusReceiver) -> Self {
        Self { id, job, rx }
    }

    /// Wait for the next change. `None` once the publisher is gone and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<StatusChange> {
        self.rx.recv().await
    }

    /// Take the next queued change without waiting.
    ///
    /// `Ok(None)` means nothing is queued yet; `Err` means the channel is
    /// closed and empty.
    pub fn try_recv(&mut self) -> Result<Option<StatusChange>, Disconnected> {
        match self.rx.try_recv() {
            Ok(change) => Ok(Some(change)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Disconnected),
        }
    }
}

/// The publishing side of a subscription went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
