// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact stores

mod dir;

pub use dir::DirArtifactStore;
