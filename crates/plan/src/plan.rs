// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan definitions

use crate::PlanError;
use chain_core::{ArtifactStore, JobBackend, ParameterSet, Pipeline};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// How a module is launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDef {
    /// Shell script run with `sh -c`
    #[serde(default)]
    pub run: Option<String>,
    /// Program and leading arguments, run directly
    #[serde(default)]
    pub command: Option<Vec<String>>,
    /// Working directory, relative to the plan file
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

/// One pipeline step
#[derive(Debug, Clone, PartialEq)]
pub struct StepDef {
    pub name: String,
    pub module: String,
    pub params: ParameterSet,
}

/// A `step.param` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub step: String,
    pub param: String,
}

impl Endpoint {
    pub fn parse(s: &str) -> Option<Self> {
        let (step, param) = s.split_once('.')?;
        if step.is_empty() || param.is_empty() {
            return None;
        }
        Some(Self {
            step: step.to_string(),
            param: param.to_string(),
        })
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.step, self.param)
    }
}

/// An intermediate artifact passed from one step to a later one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDef {
    pub from: Endpoint,
    pub to: Endpoint,
    pub kind: String,
}

/// A parsed pipeline plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub modules: BTreeMap<String, ModuleDef>,
    pub steps: Vec<StepDef>,
    pub links: Vec<LinkDef>,
}

impl Plan {
    /// Index of a step by name
    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    /// Get a module definition by name
    pub fn get_module(&self, name: &str) -> Option<&ModuleDef> {
        self.modules.get(name)
    }

    /// Check the plan for errors the pipeline would only hit at run time
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut seen = HashMap::new();
        for (index, step) in self.steps.iter().enumerate() {
            if seen.insert(step.name.as_str(), index).is_some() {
                return Err(PlanError::DuplicateStep(step.name.clone()));
            }
            if !self.modules.contains_key(&step.module) {
                return Err(PlanError::UnknownModule {
                    step: step.name.clone(),
                    module: step.module.clone(),
                });
            }
        }

        for (name, module) in &self.modules {
            match (&module.run, &module.command) {
                (Some(_), None) => {}
                (None, Some(command)) if !command.is_empty() => {}
                _ => {
                    return Err(PlanError::InvalidFormat(format!(
                        "module.{} needs exactly one of `run` or a non-empty `command`",
                        name
                    )))
                }
            }
        }

        let mut fed: HashMap<&Endpoint, &Endpoint> = HashMap::new();
        for link in &self.links {
            let invalid = |reason: &str| PlanError::InvalidLink {
                from: link.from.to_string(),
                to: link.to.to_string(),
                reason: reason.to_string(),
            };
            let from = seen
                .get(link.from.step.as_str())
                .ok_or_else(|| PlanError::UnknownStep(link.from.step.clone()))?;
            let to = seen
                .get(link.to.step.as_str())
                .ok_or_else(|| PlanError::UnknownStep(link.to.step.clone()))?;
            if to <= from {
                return Err(invalid("consuming step must come after the producing step"));
            }
            if let Some(other) = fed.insert(&link.to, &link.from) {
                if other != &link.from {
                    return Err(invalid(&format!("{} is already fed by {}", link.to, other)));
                }
            }
        }
        Ok(())
    }

    /// Add every step and link to an idle pipeline
    pub fn apply<B: JobBackend, S: ArtifactStore>(
        &self,
        pipeline: &mut Pipeline<B, S>,
    ) -> Result<(), PlanError> {
        self.validate()?;
        let offset = pipeline.step_count();
        for step in &self.steps {
            pipeline.add_step(step.module.as_str(), step.params.clone())?;
        }
        for link in &self.links {
            let from = self
                .step_index(&link.from.step)
                .ok_or_else(|| PlanError::UnknownStep(link.from.step.clone()))?;
            let to = self
                .step_index(&link.to.step)
                .ok_or_else(|| PlanError::UnknownStep(link.to.step.clone()))?;
            pipeline.add_intermediate_node(
                offset + from,
                &link.from.param,
                offset + to,
                &link.to.param,
                link.kind.as_str(),
            )?;
        }
        tracing::debug!(
            steps = self.steps.len(),
            links = self.links.len(),
            "plan applied"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
