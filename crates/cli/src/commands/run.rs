// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline run command

use crate::backend::{artifact_dir, pipeline_for};
use anyhow::{Context, Result};
use chain_core::Status;
use chain_plan::load_plan;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(clap::Args)]
pub struct RunArgs {
    /// Plan file
    plan: PathBuf,

    /// Start every step in blocking mode
    #[arg(long)]
    wait: bool,

    /// Directory for intermediate artifacts [env: CHAIN_ARTIFACT_DIR]
    #[arg(long)]
    artifact_dir: Option<PathBuf>,
}

pub async fn handle(args: RunArgs) -> Result<()> {
    let plan = load_plan(&args.plan)?;
    let mut pipeline = pipeline_for(&plan, artifact_dir(args.artifact_dir));
    plan.apply(&mut pipeline)?;

    let names: Vec<String> = plan.steps.iter().map(|s| s.name.clone()).collect();
    pipeline.on_step_status_changed(move |step, status| {
        let name = names.get(step).map(String::as_str).unwrap_or("?");
        println!("[{}] {}: {}", step, name, status);
    });

    // Ctrl-C cancels the executing step, also while a blocking run holds
    // the pipeline
    let (interrupt_tx, mut interrupts) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling pipeline...");
        let _ = interrupt_tx.send(());
    })?;
    let handle = pipeline.cancel_handle();
    tokio::spawn(async move {
        if interrupts.recv().await.is_some() {
            if let Err(e) = handle.cancel().await {
                tracing::error!(error = %e, "failed to cancel pipeline");
            }
        }
    });

    match pipeline.run(args.wait).await {
        Err(e) if e.is_degenerate_success() => {
            println!("Nothing to run");
            return Ok(());
        }
        result => result?,
    }

    let outcome = pipeline.wait().await;
    let status = pipeline.status();
    match outcome {
        Ok(()) if status == Status::Completed => {
            println!("Pipeline completed");
            Ok(())
        }
        Ok(()) => anyhow::bail!("pipeline stopped while {}", status),
        Err(e) => Err(e).with_context(|| format!("pipeline ended {}", status)),
    }
}
