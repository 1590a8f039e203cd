// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Shell prelude turning `--name value` pairs into `$arg_name` variables
pub const PARSE_ARGS: &str = r#"while [ $# -gt 1 ]; do eval "arg_${1#--}=\"\$2\""; shift 2; done"#;

/// A temp directory holding a plan file and an artifact directory
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir_all(dir.path().join("artifacts")).expect("Failed to create artifact dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn artifacts(&self) -> PathBuf {
        self.dir.path().join("artifacts")
    }

    /// Write `plan.toml` and return its path
    pub fn write_plan(&self, content: &str) -> PathBuf {
        let path = self.dir.path().join("plan.toml");
        fs::write(&path, content).expect("Failed to write plan");
        path
    }

    /// Number of files left in the artifact directory, hidden ones included
    pub fn leftover_artifacts(&self) -> usize {
        fn count(dir: &Path) -> usize {
            fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .flatten()
                        .map(|e| {
                            let path = e.path();
                            if path.is_dir() {
                                count(&path)
                            } else {
                                1
                            }
                        })
                        .sum()
                })
                .unwrap_or(0)
        }
        count(&self.artifacts())
    }
}

/// A `[module.<name>]` table running `body` after argument parsing
pub fn module(name: &str, body: &str) -> String {
    let script = format!("{}\n{}", PARSE_ARGS, body);
    format!(
        "[module.{}]\nrun = '''\n{}\n'''\ncwd = \".\"\n",
        name, script
    )
}
