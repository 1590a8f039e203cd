// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Pipeline plan parsing and definition

mod parser;
mod plan;

pub use parser::{load_plan, parse_plan, PlanError};
pub use plan::{Endpoint, LinkDef, ModuleDef, Plan, StepDef};
