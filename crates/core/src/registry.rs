// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Intermediate artifact registry
//!
//! Tracks which step parameter produces an artifact and which parameters
//! consume it, and owns the artifacts created during a run. The registry
//! never edits step parameters itself: it returns [`Assignment`]s that the
//! pipeline applies.

use crate::artifact::{ArtifactKey, ArtifactKind, ArtifactLink, ArtifactRef, ArtifactSpec};
use crate::backend::{ArtifactStore, StoreError};
use crate::error::PipelineError;
use crate::params::ParamValue;
use std::collections::BTreeMap;

/// A parameter value the pipeline must write into a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub key: ArtifactKey,
    pub value: ParamValue,
}

#[derive(Debug, Clone)]
struct Producer {
    kind: ArtifactKind,
    consumers: Vec<ArtifactKey>,
}

impl Producer {
    fn last_consumer_step(&self) -> usize {
        self.consumers.iter().map(|c| c.step).max().unwrap_or(0)
    }

    fn assignments(&self, key: &ArtifactKey, value: &ParamValue) -> Vec<Assignment> {
        std::iter::once(key)
            .chain(self.consumers.iter())
            .map(|k| Assignment {
                key: k.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

/// Artifact links of one pipeline and the artifacts alive in its run
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    producers: BTreeMap<ArtifactKey, Producer>,
    live: BTreeMap<ArtifactKey, ArtifactRef>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link. Links sharing a producer key add consumers.
    ///
    /// Returns the placeholder assignments reserving both endpoints.
    pub fn declare(
        &mut self,
        link: ArtifactLink,
        step_count: usize,
    ) -> Result<Vec<Assignment>, PipelineError> {
        let invalid = |reason: &str| PipelineError::InvalidArtifactLink {
            from: link.from.clone(),
            to: link.to.clone(),
            reason: reason.to_string(),
        };

        if link.from.step >= step_count {
            return Err(invalid("producing step does not exist"));
        }
        if link.to.step >= step_count {
            return Err(invalid("consuming step does not exist"));
        }
        if link.to.step <= link.from.step {
            return Err(invalid("consuming step must run after the producing step"));
        }
        if self.producers.contains_key(&link.to) {
            return Err(invalid("consuming parameter is already an artifact output"));
        }
        if self.is_consumer(&link.from) {
            return Err(invalid("producing parameter is already an artifact input"));
        }
        if let Some((owner, _)) = self
            .producers
            .iter()
            .find(|(key, p)| **key != link.from && p.consumers.contains(&link.to))
        {
            return Err(invalid(&format!("consuming parameter is already fed by {}", owner)));
        }

        let producer = self
            .producers
            .entry(link.from.clone())
            .or_insert_with(|| Producer {
                kind: link.kind.clone(),
                consumers: Vec::new(),
            });
        if producer.kind != link.kind {
            return Err(invalid(&format!(
                "artifact kind {} conflicts with declared kind {}",
                link.kind, producer.kind
            )));
        }
        if !producer.consumers.contains(&link.to) {
            producer.consumers.push(link.to.clone());
        }

        let placeholder = ParamValue::Placeholder(link.kind.clone());
        Ok(vec![
            Assignment {
                key: link.from,
                value: placeholder.clone(),
            },
            Assignment {
                key: link.to,
                value: placeholder,
            },
        ])
    }

    /// Placeholder assignments for every reserved parameter of a step
    pub fn reservations(&self, step: usize) -> Vec<Assignment> {
        let mut out = Vec::new();
        for (key, producer) in &self.producers {
            let value = match self.live.get(key) {
                Some(artifact) => ParamValue::Artifact(artifact.clone()),
                None => ParamValue::Placeholder(producer.kind.clone()),
            };
            for k in std::iter::once(key).chain(producer.consumers.iter()) {
                if k.step == step {
                    out.push(Assignment {
                        key: k.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        out
    }

    /// All declared links, one per consumer
    pub fn links(&self) -> Vec<ArtifactLink> {
        self.producers
            .iter()
            .flat_map(|(from, p)| {
                p.consumers.iter().map(move |to| ArtifactLink {
                    from: from.clone(),
                    to: to.clone(),
                    kind: p.kind.clone(),
                })
            })
            .collect()
    }

    /// Consumers linked to a producing parameter
    pub fn consumers_of(&self, key: &ArtifactKey) -> &[ArtifactKey] {
        self.producers
            .get(key)
            .map_or(&[], |p| p.consumers.as_slice())
    }

    /// Artifact currently alive for a producing parameter
    pub fn live(&self, key: &ArtifactKey) -> Option<&ArtifactRef> {
        self.live.get(key)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Forget run state before a new run.
    ///
    /// Returns artifacts that were still registered; a finalized run leaves
    /// none behind.
    pub fn begin_run(&mut self) -> Vec<ArtifactRef> {
        std::mem::take(&mut self.live).into_values().collect()
    }

    /// Create the artifacts produced by `step`, which is about to start.
    ///
    /// Each artifact is written into the producing parameter and every
    /// linked consumer, so they share one object.
    pub async fn create_inputs_for<S: ArtifactStore>(
        &mut self,
        step: usize,
        store: &S,
    ) -> Result<Vec<Assignment>, StoreError> {
        let mut assignments = Vec::new();
        for (key, producer) in self.producers.range(ArtifactKey::new(step, "")..) {
            if key.step != step {
                break;
            }
            if self.live.contains_key(key) {
                continue;
            }

            let spec = ArtifactSpec::intermediate(producer.kind.clone(), key);
            let artifact = store.allocate(&spec).await?;
            tracing::debug!(
                artifact = %artifact,
                kind = %producer.kind,
                producer = %key,
                consumers = producer.consumers.len(),
                "artifact created"
            );

            let value = ParamValue::Artifact(artifact.clone());
            assignments.extend(producer.assignments(key, &value));
            self.live.insert(key.clone(), artifact);
        }
        Ok(assignments)
    }

    /// Free every artifact whose consumers have all started by `running`.
    pub async fn release_consumed_by<S: ArtifactStore>(
        &mut self,
        running: usize,
        store: &S,
    ) -> Result<Vec<Assignment>, StoreError> {
        let done: Vec<ArtifactKey> = self
            .live
            .keys()
            .filter(|key| {
                self.producers
                    .get(*key)
                    .is_some_and(|p| p.last_consumer_step() <= running)
            })
            .cloned()
            .collect();
        self.release(done, store).await
    }

    /// Free every live artifact
    pub async fn release_all<S: ArtifactStore>(
        &mut self,
        store: &S,
    ) -> Result<Vec<Assignment>, StoreError> {
        let keys: Vec<ArtifactKey> = self.live.keys().cloned().collect();
        self.release(keys, store).await
    }

    /// Free the given artifacts. Every one is attempted and dropped from the
    /// registry; the first store error is returned afterwards.
    async fn release<S: ArtifactStore>(
        &mut self,
        keys: Vec<ArtifactKey>,
        store: &S,
    ) -> Result<Vec<Assignment>, StoreError> {
        let mut assignments = Vec::new();
        let mut first_error = None;

        for key in keys {
            let Some(artifact) = self.live.remove(&key) else {
                continue;
            };
            if let Err(e) = store.free(&artifact).await {
                tracing::warn!(artifact = %artifact, error = %e, "failed to free artifact");
                first_error.get_or_insert(e);
            } else {
                tracing::debug!(artifact = %artifact, producer = %key, "artifact released");
            }
            if let Some(producer) = self.producers.get(&key) {
                let placeholder = ParamValue::Placeholder(producer.kind.clone());
                assignments.extend(producer.assignments(&key, &placeholder));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(assignments),
        }
    }

    fn is_consumer(&self, key: &ArtifactKey) -> bool {
        self.producers.values().any(|p| p.consumers.contains(key))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
