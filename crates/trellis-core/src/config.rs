use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use trellis_util::errors::TrellisError;

use crate::artifact::{ConflictId, Exclusion};
use crate::filter::{ArtifactFilter, ScopeFilter};
use crate::managed::{ManagedArtifact, ManagedVersions};
use crate::repository::Repository;
use crate::scope::Scope;

/// Resolver configuration, usually loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    #[serde(default = "default_local_repository")]
    pub local_repository: Repository,

    #[serde(default = "default_remote_repositories")]
    pub remote_repositories: Vec<Repository>,

    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Dependency management, keyed by `group:name[:type[:classifier]]`.
    #[serde(default)]
    pub management: BTreeMap<String, ManagedEntry>,
}

/// Settings from `[resolution]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Classpath scope used to filter the resolved set.
    #[serde(default)]
    pub scope: Option<Scope>,
}

/// One `[management."group:name"]` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagedEntry {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub exclusions: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            local_repository: default_local_repository(),
            remote_repositories: default_remote_repositories(),
            resolution: ResolutionConfig::default(),
            management: BTreeMap::new(),
        }
    }
}

fn default_local_repository() -> Repository {
    Repository::new("local", &maven_home().join("repository").to_string_lossy())
}

fn default_remote_repositories() -> Vec<Repository> {
    vec![Repository::maven_central()]
}

impl ResolverConfig {
    /// Load a configuration file, or return defaults if it doesn't exist.
    pub fn load(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| TrellisError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&content)
    }

    /// Parse a configuration from TOML text.
    pub fn parse(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            TrellisError::Config {
                message: format!("Failed to parse resolver config: {e}"),
            }
            .into()
        })
    }

    /// Build the managed-version map from `[management]`.
    pub fn managed_versions(&self) -> miette::Result<ManagedVersions> {
        let mut managed = ManagedVersions::new();
        for (key, entry) in &self.management {
            let id = ConflictId::parse(key).ok_or_else(|| TrellisError::Config {
                message: format!("Invalid management key `{key}`, expected group:name"),
            })?;
            let exclusions = entry
                .exclusions
                .iter()
                .map(|e| {
                    Exclusion::parse(e).ok_or_else(|| TrellisError::Config {
                        message: format!("Invalid exclusion `{e}` for `{key}`"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            managed.insert(
                id,
                ManagedArtifact {
                    version: entry.version.clone(),
                    scope: entry.scope,
                    exclusions,
                },
            );
        }
        Ok(managed)
    }

    /// The classpath filter configured in `[resolution]`, if any.
    pub fn filter(&self) -> Option<Box<dyn ArtifactFilter>> {
        self.resolution
            .scope
            .map(|scope| Box::new(ScopeFilter::new(scope)) as Box<dyn ArtifactFilter>)
    }
}

/// Returns the path to the Maven data directory (`~/.m2/`).
pub fn maven_home() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".m2")
}
