// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executable module definitions

use chain_core::ParameterSet;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// How to launch one module. Step parameters are appended as
/// `--name value` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ModuleCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Run a script with `sh -c`; parameters arrive as `$1`, `$2`, ...
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script).arg("sh")
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Build the command line for one run
    pub(crate) fn command(&self, params: &ParameterSet) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(params.to_args())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        // Terminal signals go to the runner only; it cancels modules itself
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}
