//! Artifact filters applied while expanding nodes and assembling results.

use crate::artifact::{Artifact, Exclusion};
use crate::scope::Scope;

/// Decides whether an artifact takes part in resolution.
pub trait ArtifactFilter {
    fn include(&self, artifact: &Artifact) -> bool;
}

/// Keeps the artifacts that belong on the classpath of a given scope.
///
/// - `compile`: compile, provided and system artifacts
/// - `runtime`: compile and runtime artifacts
/// - `test`: everything
/// - `provided` / `system`: only that scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeFilter {
    scope: Scope,
}

impl ScopeFilter {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }
}

impl ArtifactFilter for ScopeFilter {
    fn include(&self, artifact: &Artifact) -> bool {
        let scope = artifact.effective_scope();
        match self.scope {
            Scope::Compile => matches!(scope, Scope::Compile | Scope::Provided | Scope::System),
            Scope::Runtime => matches!(scope, Scope::Compile | Scope::Runtime),
            Scope::Test => true,
            Scope::Provided => scope == Scope::Provided,
            Scope::System => scope == Scope::System,
        }
    }
}

/// Rejects artifacts matching any of its exclusions.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    exclusions: Vec<Exclusion>,
}

impl ExclusionFilter {
    pub fn new(exclusions: Vec<Exclusion>) -> Self {
        Self { exclusions }
    }
}

impl ArtifactFilter for ExclusionFilter {
    fn include(&self, artifact: &Artifact) -> bool {
        !self.exclusions.iter().any(|e| e.matches(artifact))
    }
}

/// Includes an artifact only when every inner filter does.
#[derive(Default)]
pub struct AndFilter {
    filters: Vec<Box<dyn ArtifactFilter>>,
}

impl AndFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl ArtifactFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl ArtifactFilter for AndFilter {
    fn include(&self, artifact: &Artifact) -> bool {
        self.filters.iter().all(|f| f.include(artifact))
    }
}
