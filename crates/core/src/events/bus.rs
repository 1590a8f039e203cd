// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status bus for routing job status changes to subscribers

use super::subscription::{SubscriberId, Subscription};
use crate::job::{JobId, StatusChange};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Sender for status delivery
pub type StatusSender = mpsc::UnboundedSender<StatusChange>;
/// Receiver for status delivery
pub type StatusReceiver = mpsc::UnboundedReceiver<StatusChange>;

type Subscribers = HashMap<JobId, Vec<(SubscriberId, StatusSender)>>;

/// Routes each [`StatusChange`] to the subscribers of its job.
///
/// Backends own one bus and publish every transition through it. Channels
/// are unbounded and FIFO, so each subscriber sees every transition exactly
/// once and in publish order.
pub struct StatusBus {
    subscribers: Arc<RwLock<Subscribers>>,
    next_id: Arc<AtomicU64>,
}

impl StatusBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Subscribe to the status changes of one job
    pub fn subscribe(&self, job: &JobId) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::SeqCst));

        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.entry(job.clone()).or_default().push((id, tx));

        Subscription::new(id, job.clone(), rx)
    }

    /// Unsubscribe from a job. Changes already queued stay in the receiver.
    pub fn unsubscribe(&self, job: &JobId, id: SubscriberId) {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        if let Some(list) = subs.get_mut(job) {
            list.retain(|(sub_id, _)| *sub_id != id);
            if list.is_empty() {
                subs.remove(job);
            }
        }
    }

    /// Publish a change to every subscriber of its job
    pub fn publish(&self, change: StatusChange) {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        if let Some(list) = subs.get_mut(&change.job) {
            // Receivers dropped without unsubscribing are pruned here
            list.retain(|(_, tx)| tx.send(change.clone()).is_ok());
            if list.is_empty() {
                subs.remove(&change.job);
            }
        }
    }

    /// Get count of active subscribers for a job
    pub fn subscriber_count(&self, job: &JobId) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(job)
            .map_or(0, Vec::len)
    }

    /// Get count of active subscribers across all jobs
    pub fn total_subscribers(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(Vec::len)
            .sum()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StatusBus {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
