// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan validation command

use crate::backend::{artifact_dir, pipeline_for};
use crate::output::{print, OutputFormat};
use anyhow::Result;
use chain_core::ParamValue;
use chain_plan::load_plan;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(clap::Args)]
pub struct CheckArgs {
    /// Plan file
    plan: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

#[derive(Serialize)]
struct StepSummary {
    index: usize,
    name: String,
    module: String,
    params: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct LinkSummary {
    from: String,
    to: String,
    kind: String,
}

#[derive(Serialize)]
struct PlanSummary {
    steps: Vec<StepSummary>,
    links: Vec<LinkSummary>,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Plan OK: {} steps, {} links",
            self.steps.len(),
            self.links.len()
        )?;
        for step in &self.steps {
            write!(f, "  {}. {} ({})", step.index, step.name, step.module)?;
            for (name, value) in &step.params {
                write!(f, " {}={}", name, value)?;
            }
            writeln!(f)?;
        }
        for link in &self.links {
            writeln!(f, "  {} -> {} [{}]", link.from, link.to, link.kind)?;
        }
        Ok(())
    }
}

fn render(value: &ParamValue) -> String {
    match value {
        ParamValue::Literal(s) => s.clone(),
        ParamValue::Reference(id) => format!("@{}", id),
        ParamValue::Placeholder(kind) => format!("<{}>", kind),
        ParamValue::Artifact(artifact) => artifact.to_string(),
    }
}

pub fn handle(args: CheckArgs) -> Result<()> {
    let plan = load_plan(&args.plan)?;

    // Applying runs the pipeline's own link checks too
    let mut pipeline = pipeline_for(&plan, artifact_dir(None));
    plan.apply(&mut pipeline)?;

    let steps = plan
        .steps
        .iter()
        .zip(pipeline.steps())
        .map(|(def, step)| StepSummary {
            index: step.index,
            name: def.name.clone(),
            module: def.module.clone(),
            params: step
                .params
                .iter()
                .map(|(name, value)| (name.clone(), render(value)))
                .collect(),
        })
        .collect();
    let links = plan
        .links
        .iter()
        .map(|link| LinkSummary {
            from: link.from.to_string(),
            to: link.to.to_string(),
            kind: link.kind.clone(),
        })
        .collect();

    print(&PlanSummary { steps, links }, args.format)
}
