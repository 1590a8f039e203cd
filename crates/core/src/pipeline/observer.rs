// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active step observations owned by a pipeline
//!
//! A pipeline watches a step in up to three roles at once. Each watched step
//! holds at most one backend subscription, dropped as soon as the step loses
//! its last role.

use crate::backend::JobBackend;
use crate::events::Subscription;
use crate::job::StatusChange;

/// Why the pipeline listens to a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverRole {
    /// Step 0, until it reports `Running`
    First,
    /// Step N-1, until the run finishes
    Last,
    /// The step currently executing
    Current,
}

#[derive(Debug, Default, Clone, Copy)]
struct Roles {
    first: bool,
    last: bool,
    current: bool,
}

impl Roles {
    fn slot(&mut self, role: ObserverRole) -> &mut bool {
        match role {
            ObserverRole::First => &mut self.first,
            ObserverRole::Last => &mut self.last,
            ObserverRole::Current => &mut self.current,
        }
    }

    fn has(&self, role: ObserverRole) -> bool {
        match role {
            ObserverRole::First => self.first,
            ObserverRole::Last => self.last,
            ObserverRole::Current => self.current,
        }
    }

    fn is_empty(&self) -> bool {
        !(self.first || self.last || self.current)
    }
}

#[derive(Debug)]
struct Observation {
    step: usize,
    roles: Roles,
    /// `None` until the step's job exists
    subscription: Option<Subscription>,
}

/// A change received from a watched step, or the loss of its channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Changed { step: usize, change: StatusChange },
    Lost { step: usize },
}

/// Table of watched steps, in the order they were first watched
#[derive(Debug, Default)]
pub(crate) struct Observers {
    entries: Vec<Observation>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `step` in `role`
    pub fn watch(&mut self, step: usize, role: ObserverRole) {
        let entry = match self.entries.iter().position(|o| o.step == step) {
            Some(i) => &mut self.entries[i],
            None => {
                self.entries.push(Observation {
                    step,
                    roles: Roles::default(),
                    subscription: None,
                });
                let last = self.entries.len() - 1;
                &mut self.entries[last]
            }
        };
        *entry.roles.slot(role) = true;
    }

    /// Bind the subscription of a watched step's job
    pub fn attach<B: JobBackend>(&mut self, step: usize, subscription: Subscription, backend: &B) {
        match self.entries.iter_mut().find(|o| o.step == step) {
            Some(entry) => {
                if let Some(old) = entry.subscription.replace(subscription) {
                    backend.unsubscribe(&old.job, old.id);
                }
            }
            None => backend.unsubscribe(&subscription.job, subscription.id),
        }
    }

    pub fn has(&self, step: usize, role: ObserverRole) -> bool {
        self.entries
            .iter()
            .any(|o| o.step == step && o.roles.has(role))
    }

    /// Stop watching `step` in `role`; unsubscribes once no role is left
    pub fn unwatch<B: JobBackend>(&mut self, step: usize, role: ObserverRole, backend: &B) {
        let Some(i) = self.entries.iter().position(|o| o.step == step) else {
            return;
        };
        *self.entries[i].roles.slot(role) = false;
        if self.entries[i].roles.is_empty() {
            let entry = self.entries.remove(i);
            if let Some(sub) = entry.subscription {
                backend.unsubscribe(&sub.job, sub.id);
            }
        }
    }

    /// Drop every observation and subscription
    pub fn clear<B: JobBackend>(&mut self, backend: &B) {
        for entry in self.entries.drain(..) {
            if let Some(sub) = entry.subscription {
                backend.unsubscribe(&sub.job, sub.id);
            }
        }
    }

    /// Next queued notification, in watch order, without waiting
    pub fn try_next(&mut self) -> Option<Notification> {
        for entry in &mut self.entries {
            let Some(sub) = entry.subscription.as_mut() else {
                continue;
            };
            match sub.try_recv() {
                Ok(Some(change)) => {
                    return Some(Notification::Changed {
                        step: entry.step,
                        change,
                    })
                }
                Ok(None) => {}
                Err(_) => return Some(Notification::Lost { step: entry.step }),
            }
        }
        None
    }

    /// Wait for the next notification from `step`. `None` if `step` has no
    /// subscription.
    pub async fn next_from(&mut self, step: usize) -> Option<Notification> {
        let sub = self
            .entries
            .iter_mut()
            .find(|o| o.step == step)
            .and_then(|o| o.subscription.as_mut())?;
        Some(match sub.recv().await {
            Some(change) => Notification::Changed { step, change },
            None => Notification::Lost { step },
        })
    }
}
