// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring plans to the process backend and the artifact directory

use chain_adapters::{
    DirArtifactStore, ModuleCommand, ProcessJobBackend, TracedArtifactStore, TracedJobBackend,
};
use chain_core::Pipeline;
use chain_plan::{ModuleDef, Plan};
use std::path::PathBuf;

pub type CliPipeline =
    Pipeline<TracedJobBackend<ProcessJobBackend>, TracedArtifactStore<DirArtifactStore>>;

/// Environment variable naming the default artifact directory
pub const ARTIFACT_DIR_ENV: &str = "CHAIN_ARTIFACT_DIR";

/// Flag value, then `CHAIN_ARTIFACT_DIR`, then a directory under the
/// system temp dir
pub fn artifact_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(ARTIFACT_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| std::env::temp_dir().join("chain-artifacts"))
}

fn module_command(module: &ModuleDef) -> Option<ModuleCommand> {
    let command = match (&module.run, &module.command) {
        (Some(script), _) => ModuleCommand::shell(script.as_str()),
        (None, Some(argv)) => {
            let (program, args) = argv.split_first()?;
            args.iter()
                .fold(ModuleCommand::new(program.as_str()), |cmd, arg| {
                    cmd.arg(arg.as_str())
                })
        }
        (None, None) => return None,
    };
    Some(match &module.cwd {
        Some(cwd) => command.current_dir(cwd.clone()),
        None => command,
    })
}

/// Build an empty pipeline able to run every module of a plan
pub fn pipeline_for(plan: &Plan, artifacts: PathBuf) -> CliPipeline {
    let backend = plan
        .modules
        .iter()
        .filter_map(|(name, def)| module_command(def).map(|cmd| (name, cmd)))
        .fold(ProcessJobBackend::new(), |backend, (name, cmd)| {
            backend.with_module(name.as_str(), cmd)
        });
    Pipeline::new(
        TracedJobBackend::new(backend),
        TracedArtifactStore::new(DirArtifactStore::new(artifacts)),
    )
}
