//! Metadata sources: where the collector learns about available versions and
//! the immediate dependencies of an artifact.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use trellis_core::artifact::{Artifact, ConflictId, Exclusion};
use trellis_core::repository::Repository;
use trellis_core::scope::Scope;
use trellis_core::version::MavenVersion;
use trellis_util::errors::{TrellisError, TrellisResult};

/// Failure reported by a metadata source, with an optional underlying cause.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct MetadataError {
    message: String,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl MetadataError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

/// Immediate dependencies of an artifact plus the repositories to search for them.
#[derive(Debug, Clone, Default)]
pub struct ResolutionGroup {
    pub artifacts: Vec<Artifact>,
    pub repositories: Vec<Repository>,
}

/// Outcome of [`MetadataSource::retrieve`].
#[derive(Debug, Clone)]
pub enum Retrieved {
    Found(ResolutionGroup),
    /// The artifact was relocated to something the build excludes; it and
    /// its subtree are dropped.
    Excluded,
}

/// Supplies artifact metadata to the collector.
///
/// Implementations own all I/O, caching and retrying; the collector treats
/// every call as a plain synchronous lookup.
pub trait MetadataSource {
    fn retrieve_available_versions(
        &self,
        artifact: &Artifact,
        local: &Repository,
        remotes: &[Repository],
    ) -> Result<Vec<MavenVersion>, MetadataError>;

    fn retrieve(
        &self,
        artifact: &Artifact,
        local: &Repository,
        remotes: &[Repository],
    ) -> Result<Retrieved, MetadataError>;
}

#[derive(Debug, Default)]
struct Entry {
    dependencies: Vec<Artifact>,
    excluded: bool,
}

/// An in-memory metadata source, built in code or loaded from a TOML catalog.
///
/// Declared dependencies are scoped relative to the artifact being retrieved
/// (see [`Scope::inherit`]). Artifacts without an entry have no dependencies.
#[derive(Debug, Default)]
pub struct StaticSource {
    entries: HashMap<String, Entry>,
    versions: HashMap<ConflictId, Vec<MavenVersion>>,
    failures: HashMap<String, String>,
    repositories: Vec<Repository>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repositories reported alongside every dependency list. When empty,
    /// the repositories of the request are passed through.
    pub fn with_repositories(mut self, repositories: Vec<Repository>) -> Self {
        self.repositories = repositories;
        self
    }

    /// Register `artifact` (which must carry a concrete version) with its
    /// declared dependencies.
    pub fn insert(&mut self, artifact: &Artifact, dependencies: Vec<Artifact>) -> TrellisResult<()> {
        let version = artifact.version().ok_or_else(|| TrellisError::Catalog {
            message: format!("{} has no concrete version", artifact.id()),
        })?;
        self.register_version(&artifact.conflict_id(), version);
        self.entries.entry(artifact.id()).or_default().dependencies = dependencies;
        Ok(())
    }

    /// Register `coordinate` with dependencies given as coordinates.
    pub fn add(&mut self, coordinate: &str, dependencies: &[&str]) -> TrellisResult<()> {
        let artifact = parse_coordinate(coordinate)?;
        let dependencies = dependencies
            .iter()
            .map(|d| parse_coordinate(d))
            .collect::<TrellisResult<Vec<_>>>()?;
        self.insert(&artifact, dependencies)
    }

    /// Report `coordinate` as relocated to an excluded artifact.
    pub fn exclude(&mut self, coordinate: &str) -> TrellisResult<()> {
        let artifact = parse_coordinate(coordinate)?;
        self.entries.entry(artifact.id()).or_default().excluded = true;
        Ok(())
    }

    /// Make every lookup for `key` fail. `key` is either an artifact id
    /// (`group:name:type:version`) or a conflict id.
    pub fn fail(&mut self, key: &str, message: &str) {
        self.failures.insert(key.to_string(), message.to_string());
    }

    /// Make versions known without registering any metadata for them.
    pub fn add_versions(&mut self, id: &ConflictId, versions: &[&str]) {
        for v in versions {
            self.register_version(id, v);
        }
    }

    fn register_version(&mut self, id: &ConflictId, version: &str) {
        let version = MavenVersion::parse(version);
        let known = self.versions.entry(id.clone()).or_default();
        if !known.contains(&version) {
            known.push(version);
            known.sort();
        }
    }

    fn check_failure(&self, keys: &[&str]) -> Result<(), MetadataError> {
        match keys.iter().find_map(|k| self.failures.get(*k)) {
            Some(message) => Err(MetadataError::new(message.clone())),
            None => Ok(()),
        }
    }

    /// Load a catalog from TOML text.
    ///
    /// ```toml
    /// [[artifact]]
    /// coordinate = "org.example:app-core:1.0"
    /// dependencies = [
    ///     { coordinate = "org.example:util:[1.0,2.0)", scope = "runtime" },
    ///     { coordinate = "org.example:extras:1.1", optional = true, exclusions = ["org.legacy"] },
    /// ]
    ///
    /// [[artifact]]
    /// coordinate = "org.example:moved:1.0"
    /// excluded = true
    /// ```
    pub fn from_toml_str(content: &str) -> TrellisResult<Self> {
        let catalog: Catalog = toml::from_str(content).map_err(|e| TrellisError::Catalog {
            message: format!("Failed to parse catalog: {e}"),
        })?;

        let mut source = Self::new();
        for entry in catalog.artifact {
            let artifact = parse_coordinate(&entry.coordinate)?;
            let mut dependencies = Vec::with_capacity(entry.dependencies.len());
            for dep in entry.dependencies {
                let mut child = parse_coordinate(&dep.coordinate)?;
                child.scope = dep.scope;
                child.optional = dep.optional;
                for e in &dep.exclusions {
                    let exclusion = Exclusion::parse(e).ok_or_else(|| TrellisError::Catalog {
                        message: format!("Invalid exclusion `{e}` on {}", dep.coordinate),
                    })?;
                    child.exclusions.push(exclusion);
                }
                dependencies.push(child);
            }
            source.insert(&artifact, dependencies)?;
            if entry.excluded {
                source.entries.entry(artifact.id()).or_default().excluded = true;
            }
        }
        Ok(source)
    }

    /// Load a catalog file.
    pub fn from_path(path: &Path) -> TrellisResult<Self> {
        let content = std::fs::read_to_string(path).map_err(TrellisError::Io)?;
        Self::from_toml_str(&content)
    }
}

impl MetadataSource for StaticSource {
    fn retrieve_available_versions(
        &self,
        artifact: &Artifact,
        _local: &Repository,
        _remotes: &[Repository],
    ) -> Result<Vec<MavenVersion>, MetadataError> {
        let id = artifact.conflict_id();
        self.check_failure(&[id.as_str()])?;
        Ok(self.versions.get(&id).cloned().unwrap_or_default())
    }

    fn retrieve(
        &self,
        artifact: &Artifact,
        _local: &Repository,
        remotes: &[Repository],
    ) -> Result<Retrieved, MetadataError> {
        let id = artifact.id();
        self.check_failure(&[id.as_str(), artifact.conflict_id().as_str()])?;
        if artifact.version().is_none() {
            return Err(MetadataError::new(format!(
                "No version selected for {id}"
            )));
        }

        let repositories = if self.repositories.is_empty() {
            remotes.to_vec()
        } else {
            self.repositories.clone()
        };
        let Some(entry) = self.entries.get(&id) else {
            tracing::debug!("No metadata registered for {id}, assuming no dependencies");
            return Ok(Retrieved::Found(ResolutionGroup {
                artifacts: Vec::new(),
                repositories,
            }));
        };
        if entry.excluded {
            return Ok(Retrieved::Excluded);
        }

        let inherited = artifact.effective_scope();
        let artifacts = entry
            .dependencies
            .iter()
            .filter_map(|dep| {
                let scope = Scope::inherit(Some(inherited), dep.effective_scope());
                if scope.is_none() {
                    tracing::trace!("{} is not transitive from {id}", dep.id());
                }
                scope.map(|s| dep.clone().with_scope(s))
            })
            .collect();

        Ok(Retrieved::Found(ResolutionGroup {
            artifacts,
            repositories,
        }))
    }
}

fn parse_coordinate(coordinate: &str) -> TrellisResult<Artifact> {
    Artifact::parse(coordinate).map_err(|e| {
        TrellisError::Catalog {
            message: e.to_string(),
        }
        .into()
    })
}

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    artifact: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    coordinate: String,
    #[serde(default)]
    excluded: bool,
    #[serde(default)]
    dependencies: Vec<CatalogDependency>,
}

#[derive(Debug, Deserialize)]
struct CatalogDependency {
    coordinate: String,
    #[serde(default)]
    scope: Option<Scope>,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    exclusions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> Repository {
        Repository::new("local", "/tmp/repo")
    }

    fn found(retrieved: Retrieved) -> ResolutionGroup {
        match retrieved {
            Retrieved::Found(group) => group,
            Retrieved::Excluded => panic!("expected dependencies, got an exclusion"),
        }
    }

    #[test]
    fn retrieve_applies_scope_inheritance() {
        let mut source = StaticSource::new();
        source
            .insert(
                &Artifact::parse("org.a:a:1.0").unwrap(),
                vec![
                    Artifact::parse("org.b:b:1.0").unwrap(),
                    Artifact::parse("org.c:c:1.0").unwrap().with_scope(Scope::Runtime),
                    Artifact::parse("org.d:d:1.0").unwrap().with_scope(Scope::Test),
                ],
            )
            .unwrap();

        let parent = Artifact::parse("org.a:a:1.0").unwrap().with_scope(Scope::Compile);
        let group = found(source.retrieve(&parent, &local(), &[]).unwrap());
        let scopes: Vec<(String, Option<Scope>)> = group
            .artifacts
            .iter()
            .map(|a| (a.name.clone(), a.scope))
            .collect();
        assert_eq!(
            scopes,
            vec![
                ("b".to_string(), Some(Scope::Compile)),
                ("c".to_string(), Some(Scope::Runtime)),
            ]
        );
    }

    #[test]
    fn retrieve_unknown_artifact_has_no_dependencies() {
        let source = StaticSource::new();
        let remotes = vec![Repository::maven_central()];
        let artifact = Artifact::parse("org.a:a:1.0").unwrap();
        let group = found(source.retrieve(&artifact, &local(), &remotes).unwrap());
        assert!(group.artifacts.is_empty());
        assert_eq!(group.repositories, remotes);
    }

    #[test]
    fn excluded_and_failing_entries() {
        let mut source = StaticSource::new();
        source.exclude("org.moved:old:1.0").unwrap();
        source.fail("org.broken:lib:jar:2.0", "connection reset");

        let moved = Artifact::parse("org.moved:old:1.0").unwrap();
        assert!(matches!(
            source.retrieve(&moved, &local(), &[]).unwrap(),
            Retrieved::Excluded
        ));

        let broken = Artifact::parse("org.broken:lib:2.0").unwrap();
        let err = source.retrieve(&broken, &local(), &[]).unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn available_versions_are_sorted_and_unique() {
        let mut source = StaticSource::new();
        let id = ConflictId::parse("org.a:a").unwrap();
        source.add_versions(&id, &["2.0", "1.0", "1.10"]);
        source.add("org.a:a:1.0", &[]).unwrap();

        let artifact = Artifact::parse("org.a:a:[1.0,)").unwrap();
        let versions = source
            .retrieve_available_versions(&artifact, &local(), &[])
            .unwrap();
        let versions: Vec<&str> = versions.iter().map(|v| v.as_str()).collect();
        assert_eq!(versions, vec!["1.0", "1.10", "2.0"]);
    }

    #[test]
    fn insert_requires_concrete_version() {
        let mut source = StaticSource::new();
        let ranged = Artifact::parse("org.a:a:[1.0,2.0)").unwrap();
        assert!(source.insert(&ranged, Vec::new()).is_err());
    }

    #[test]
    fn catalog_from_toml() {
        let source = StaticSource::from_toml_str(
            r#"
[[artifact]]
coordinate = "org.example:core:1.0"
dependencies = [
    { coordinate = "org.example:util:[1.0,2.0)", scope = "runtime" },
    { coordinate = "org.example:extras:1.1", optional = true, exclusions = ["org.legacy"] },
]

[[artifact]]
coordinate = "org.example:moved:1.0"
excluded = true
"#,
        )
        .unwrap();

        let core = Artifact::parse("org.example:core:1.0").unwrap();
        let group = found(source.retrieve(&core, &local(), &[]).unwrap());
        assert_eq!(group.artifacts.len(), 2);
        assert_eq!(group.artifacts[0].scope, Some(Scope::Runtime));
        assert!(group.artifacts[1].optional);
        assert_eq!(group.artifacts[1].exclusions[0].group, "org.legacy");

        let moved = Artifact::parse("org.example:moved:1.0").unwrap();
        assert!(matches!(
            source.retrieve(&moved, &local(), &[]).unwrap(),
            Retrieved::Excluded
        ));
    }

    #[test]
    fn catalog_rejects_bad_coordinates() {
        let err = StaticSource::from_toml_str("[[artifact]]\ncoordinate = \"nope\"\n").unwrap_err();
        assert!(err.to_string().contains("Catalog error"), "got: {err}");
    }
}
