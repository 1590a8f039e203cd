// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job backend running modules as child processes

mod backend;
mod command;

pub use backend::ProcessJobBackend;
pub use command::ModuleCommand;
