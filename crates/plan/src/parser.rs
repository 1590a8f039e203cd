// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan TOML parsing
//!
//! ```toml
//! [module.smooth]
//! run = "smooth-volume \"$@\""
//!
//! [[step]]
//! name = "blur"
//! module = "smooth"
//! [step.params]
//! sigma = 2.5
//! mask = { ref = "MRHead" }
//!
//! [[link]]
//! from = "blur.output"
//! to = "segment.input"
//! kind = "volume"
//! ```

use crate::plan::{Endpoint, LinkDef, ModuleDef, Plan, StepDef};
use chain_core::{ParamValue, ParameterSet, PipelineError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading or applying a plan
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("duplicate step name: {0}")]
    DuplicateStep(String),
    #[error("step {step} uses undefined module {module}")]
    UnknownModule { step: String, module: String },
    #[error("link references undefined step: {0}")]
    UnknownStep(String),
    #[error("invalid link {from} -> {to}: {reason}")]
    InvalidLink {
        from: String,
        to: String,
        reason: String,
    },
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Read and parse a plan file. Relative module `cwd`s are resolved
/// against the plan's directory.
pub fn load_plan(path: &Path) -> Result<Plan, PlanError> {
    let content = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut plan = parse_plan(&content)?;

    let base = path.parent().unwrap_or(Path::new("."));
    for module in plan.modules.values_mut() {
        if let Some(cwd) = module.cwd.as_mut() {
            if cwd.is_relative() {
                *cwd = base.join(&*cwd);
            }
        }
    }
    Ok(plan)
}

/// Parse a plan from TOML content
pub fn parse_plan(content: &str) -> Result<Plan, PlanError> {
    let raw: toml::Value = toml::from_str(content)?;
    let table = raw
        .as_table()
        .ok_or_else(|| PlanError::InvalidFormat("root must be a table".to_string()))?;

    let mut plan = Plan::default();

    // Parse modules
    if let Some(modules) = table.get("module") {
        let modules = modules
            .as_table()
            .ok_or_else(|| PlanError::InvalidFormat("module must be a table".to_string()))?;
        for (name, value) in modules {
            let module: ModuleDef = value
                .clone()
                .try_into()
                .map_err(|e| PlanError::InvalidFormat(format!("module.{}: {}", name, e)))?;
            plan.modules.insert(name.clone(), module);
        }
    }

    // Parse steps, in declaration order
    for (index, value) in array_of(table, "step")?.iter().enumerate() {
        plan.steps.push(parse_step(index, value)?);
    }

    // Parse links
    for (index, value) in array_of(table, "link")?.iter().enumerate() {
        plan.links.push(parse_link(index, value)?);
    }

    Ok(plan)
}

fn array_of<'a>(table: &'a toml::Table, key: &str) -> Result<&'a [toml::Value], PlanError> {
    match table.get(key) {
        None => Ok(&[]),
        Some(value) => value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| PlanError::InvalidFormat(format!("{} must be an array of tables", key))),
    }
}

fn string_field(table: &toml::Table, key: &str, context: &str) -> Result<String, PlanError> {
    table
        .get(key)
        .ok_or_else(|| PlanError::MissingField(format!("{}.{}", context, key)))?
        .as_str()
        .map(String::from)
        .ok_or_else(|| PlanError::InvalidFormat(format!("{}.{} must be a string", context, key)))
}

fn parse_step(index: usize, value: &toml::Value) -> Result<StepDef, PlanError> {
    let context = format!("step[{}]", index);
    let table = value
        .as_table()
        .ok_or_else(|| PlanError::InvalidFormat(format!("{} must be a table", context)))?;

    let name = string_field(table, "name", &context)?;
    // The module defaults to the step name
    let module = match table.get("module") {
        Some(_) => string_field(table, "module", &context)?,
        None => name.clone(),
    };

    let mut params = ParameterSet::new();
    if let Some(raw) = table.get("params") {
        let raw = raw.as_table().ok_or_else(|| {
            PlanError::InvalidFormat(format!("step.{}.params must be a table", name))
        })?;
        for (key, value) in raw {
            let value = parse_param(value).ok_or_else(|| {
                PlanError::InvalidFormat(format!(
                    "step.{}.params.{}: expected a string, number, boolean or {{ ref = \"...\" }}",
                    name, key
                ))
            })?;
            params.set(key.clone(), value);
        }
    }

    Ok(StepDef {
        name,
        module,
        params,
    })
}

/// Scalars become literals; `{ ref = "id" }` references an existing object
fn parse_param(value: &toml::Value) -> Option<ParamValue> {
    match value {
        toml::Value::String(s) => Some(ParamValue::from(s.as_str())),
        toml::Value::Integer(n) => Some(ParamValue::from(*n)),
        toml::Value::Float(n) => Some(ParamValue::from(*n)),
        toml::Value::Boolean(b) => Some(ParamValue::from(*b)),
        toml::Value::Table(t) if t.len() == 1 => t
            .get("ref")
            .and_then(|v| v.as_str())
            .map(|id| ParamValue::Reference(id.to_string())),
        _ => None,
    }
}

fn parse_link(index: usize, value: &toml::Value) -> Result<LinkDef, PlanError> {
    let context = format!("link[{}]", index);
    let table = value
        .as_table()
        .ok_or_else(|| PlanError::InvalidFormat(format!("{} must be a table", context)))?;

    let endpoint = |key: &str| -> Result<Endpoint, PlanError> {
        let raw = string_field(table, key, &context)?;
        Endpoint::parse(&raw).ok_or_else(|| {
            PlanError::InvalidFormat(format!(
                "{}.{}: expected \"step.param\", got {:?}",
                context, key, raw
            ))
        })
    };

    Ok(LinkDef {
        from: endpoint("from")?,
        to: endpoint("to")?,
        kind: string_field(table, "kind", &context)?,
    })
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
