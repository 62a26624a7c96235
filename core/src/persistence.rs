//! JSON file holding every quenched artifact, newest first.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use iadess_types::Artifact;
use iadess_utils::{WriteOptions, atomic_write_with, ensure_parent_dir, recover_backup};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize artifacts: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ArtifactRepository {
    path: PathBuf,
    options: WriteOptions,
}

impl ArtifactRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: WriteOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored artifact. A missing or unreadable file yields an empty list.
    #[must_use]
    pub fn load(&self) -> Vec<Artifact> {
        recover_backup(&self.path);
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read artifacts: {e}");
                return Vec::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Ignoring corrupt artifact file: {e}");
                Vec::new()
            }
        }
    }

    /// Replace the file contents with `artifacts`.
    pub fn save_all(&self, artifacts: &[Artifact]) -> Result<(), RepositoryError> {
        let json = serde_json::to_vec_pretty(artifacts)?;
        ensure_parent_dir(&self.path).map_err(|source| self.io_error(source))?;
        atomic_write_with(&self.path, &json, self.options).map_err(|source| self.io_error(source))?;
        tracing::debug!(path = %self.path.display(), count = artifacts.len(), "Saved artifacts");
        Ok(())
    }

    /// Prepend `artifact` to the stored list.
    pub fn save(&self, artifact: &Artifact) -> Result<(), RepositoryError> {
        let mut artifacts = self.load();
        artifacts.insert(0, artifact.clone());
        self.save_all(&artifacts)
    }

    pub fn clear(&self) -> Result<(), RepositoryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> RepositoryError {
        RepositoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
