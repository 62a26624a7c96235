//! In-memory artifact collection with a selection pointer.

use iadess_types::{Artifact, ArtifactId};

/// Artifacts in creation order (oldest first) plus the selected one.
#[derive(Debug, Default, Clone)]
pub struct ArtifactStore {
    artifacts: Vec<Artifact>,
    selected: Option<ArtifactId>,
}

impl ArtifactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted artifacts, which are stored newest first.
    #[must_use]
    pub fn from_persisted(mut newest_first: Vec<Artifact>) -> Self {
        newest_first.reverse();
        Self {
            artifacts: newest_first,
            selected: None,
        }
    }

    /// Append and select.
    pub fn push(&mut self, artifact: Artifact) {
        self.selected = Some(artifact.id.clone());
        self.artifacts.push(artifact);
    }

    #[must_use]
    pub fn list(&self) -> &[Artifact] {
        &self.artifacts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| &a.id == id)
    }

    /// Select by id. Unknown ids leave the selection untouched.
    pub fn select(&mut self, id: &ArtifactId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.selected = Some(id.clone());
        true
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Artifact> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }
}
