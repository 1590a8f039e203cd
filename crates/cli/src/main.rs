// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! chain - run pipelines of chained modules

mod backend;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, run};

#[derive(Parser)]
#[command(
    name = "chain",
    version,
    about = "chain runs modules one after another, passing intermediate artifacts between them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline plan
    Run(run::RunArgs),
    /// Validate a pipeline plan without running it
    Check(check::CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run::handle(args).await,
        Commands::Check(args) => check::handle(args),
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
