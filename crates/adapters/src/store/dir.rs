// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory-backed artifact store
//!
//! Each artifact is an empty file under `<root>/<kind>/`, created by
//! `allocate` and deleted by `free`. The file path is the artifact
//! reference, so it can be handed to a module as a parameter. Hidden
//! artifacts are dot-files.

use async_trait::async_trait;
use chain_core::{ArtifactKind, ArtifactRef, ArtifactSpec, ArtifactStore, StoreError};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Artifact store keeping one file per artifact
#[derive(Debug, Clone)]
pub struct DirArtifactStore {
    root: PathBuf,
}

impl DirArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: &ArtifactKind) -> PathBuf {
        self.root.join(kind.as_str())
    }

    fn file_name(spec: &ArtifactSpec) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        let name = format!("{}-{}", spec.label, &suffix[..8]);
        if spec.hidden {
            format!(".{}", name)
        } else {
            name
        }
    }

    /// Reject references that do not point into this store
    fn owned_path(&self, artifact: &ArtifactRef) -> Result<PathBuf, StoreError> {
        let path = PathBuf::from(artifact.as_str());
        if !path.starts_with(&self.root) {
            return Err(StoreError::NotFound(artifact.clone()));
        }
        Ok(path)
    }
}

#[async_trait]
impl ArtifactStore for DirArtifactStore {
    async fn allocate(&self, spec: &ArtifactSpec) -> Result<ArtifactRef, StoreError> {
        let dir = self.kind_dir(&spec.kind);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::AllocationFailed {
                kind: spec.kind.clone(),
                reason: format!("{}: {}", dir.display(), e),
            })?;

        let path = dir.join(Self::file_name(spec));
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::AllocationFailed {
                kind: spec.kind.clone(),
                reason: format!("{}: {}", path.display(), e),
            })?;

        Ok(ArtifactRef(path.display().to_string()))
    }

    async fn free(&self, artifact: &ArtifactRef) -> Result<(), StoreError> {
        let path = self.owned_path(artifact)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(artifact.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn count_by_kind(&self, kind: &ArtifactKind) -> Result<usize, StoreError> {
        let mut entries = match tokio::fs::read_dir(self.kind_dir(kind)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
#[path = "dir_tests.rs"]
mod tests;
