//! Externally pinned versions and scopes (dependency management).

use std::collections::HashMap;

use crate::artifact::{Artifact, ConflictId, Exclusion};
use crate::scope::Scope;

/// Version, scope and exclusions imposed on every occurrence of a dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedArtifact {
    pub version: Option<String>,
    pub scope: Option<Scope>,
    pub exclusions: Vec<Exclusion>,
}

impl From<&Artifact> for ManagedArtifact {
    fn from(artifact: &Artifact) -> Self {
        Self {
            version: artifact.version().map(str::to_string),
            scope: artifact.scope,
            exclusions: artifact.exclusions.clone(),
        }
    }
}

/// Managed entries keyed by conflict id.
#[derive(Debug, Clone, Default)]
pub struct ManagedVersions {
    entries: HashMap<ConflictId, ManagedArtifact>,
}

impl ManagedVersions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_artifacts<'a>(artifacts: impl IntoIterator<Item = &'a Artifact>) -> Self {
        let entries = artifacts
            .into_iter()
            .map(|a| (a.conflict_id(), ManagedArtifact::from(a)))
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, id: ConflictId, managed: ManagedArtifact) -> Option<ManagedArtifact> {
        self.entries.insert(id, managed)
    }

    pub fn get(&self, id: &ConflictId) -> Option<&ManagedArtifact> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ConflictId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn remove(&mut self, id: &ConflictId) -> Option<ManagedArtifact> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
