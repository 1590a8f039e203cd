// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step parameters

use crate::artifact::{ArtifactKind, ArtifactRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value bound to one parameter name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Plain value passed through as-is
    Literal(String),
    /// Reference to an object that exists outside the pipeline
    Reference(String),
    /// Reserved for an intermediate artifact not created yet
    Placeholder(ArtifactKind),
    /// Intermediate artifact created for the current run
    Artifact(ArtifactRef),
}

impl ParamValue {
    /// Text handed to the backend, `None` for unresolved placeholders
    pub fn as_arg(&self) -> Option<&str> {
        match self {
            ParamValue::Literal(v) | ParamValue::Reference(v) => Some(v),
            ParamValue::Artifact(r) => Some(r.as_str()),
            ParamValue::Placeholder(_) => None,
        }
    }

    pub fn artifact(&self) -> Option<&ArtifactRef> {
        match self {
            ParamValue::Artifact(r) => Some(r),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Literal(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Literal(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Literal(n.to_string())
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Literal(n.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Literal(b.to_string())
    }
}

/// Named parameters of one step, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Builder-style insert of an external reference
    pub fn with_reference(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.0.insert(name.into(), ParamValue::Reference(id.into()));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Names of parameters still waiting for an artifact
    pub fn unresolved(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, v)| matches!(v, ParamValue::Placeholder(_)))
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Render as `--name value` command-line arguments.
    ///
    /// Unresolved placeholders are skipped.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.0.len() * 2);
        for (name, value) in &self.0 {
            if let Some(arg) = value.as_arg() {
                args.push(format!("--{}", name));
                args.push(arg.to_string());
            }
        }
        args
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
