//! Dependency references: identity, conflict ids, and the mutable
//! resolution state the collector updates in place.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::range::{InvalidVersionSpec, VersionRange};
use crate::scope::Scope;
use crate::version::MavenVersion;

/// Packaging type used when a coordinate does not name one.
pub const DEFAULT_TYPE: &str = "jar";

/// Identity of a dependency without its version: `group:name:type[:classifier]`.
///
/// Two artifacts with the same conflict id are the same dependency as far as
/// mediation is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConflictId(String);

impl ConflictId {
    pub fn new(group: &str, name: &str, kind: &str, classifier: Option<&str>) -> Self {
        match classifier {
            Some(c) => Self(format!("{group}:{name}:{kind}:{c}")),
            None => Self(format!("{group}:{name}:{kind}")),
        }
    }

    /// Parse `group:name`, `group:name:type` or `group:name:type:classifier`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        match parts.as_slice() {
            [group, name] => Some(Self::new(group, name, DEFAULT_TYPE, None)),
            [group, name, kind] => Some(Self::new(group, name, kind, None)),
            [group, name, kind, classifier] => {
                Some(Self::new(group, name, kind, Some(*classifier)))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A transitive dependency to exclude. Without a name, the whole group is excluded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    pub group: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Exclusion {
    /// Parse `group`, `group:*` or `group:name`.
    pub fn parse(s: &str) -> Option<Self> {
        let (group, name) = match s.trim().split_once(':') {
            Some((g, "*")) => (g, None),
            Some((g, n)) => (g, Some(n.to_string())),
            None => (s.trim(), None),
        };
        if group.is_empty() || name.as_deref() == Some("") {
            return None;
        }
        Some(Self {
            group: group.to_string(),
            name,
        })
    }

    pub fn matches(&self, artifact: &Artifact) -> bool {
        self.group == artifact.group
            && self.name.as_deref().map_or(true, |n| n == artifact.name)
    }
}

/// A coordinate string that could not be turned into an [`Artifact`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    #[error("invalid coordinate `{0}`: expected group:name[:type[:classifier]]:version")]
    Shape(String),

    #[error("invalid version in coordinate `{coordinate}`: {source}")]
    Version {
        coordinate: String,
        #[source]
        source: InvalidVersionSpec,
    },
}

/// A dependency reference together with its resolution state.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub group: String,
    pub name: String,
    pub kind: String,
    pub classifier: Option<String>,
    /// Declared scope; `None` means the default (compile) was not written out.
    pub scope: Option<Scope>,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
    version_range: VersionRange,
    version: Option<String>,
    dependency_trail: Vec<String>,
    available_versions: Option<Vec<MavenVersion>>,
}

impl Artifact {
    pub fn new(group: &str, name: &str, range: VersionRange) -> Self {
        let version = range.recommended().map(|v| v.to_string());
        Self {
            group: group.to_string(),
            name: name.to_string(),
            kind: DEFAULT_TYPE.to_string(),
            classifier: None,
            scope: None,
            optional: false,
            exclusions: Vec::new(),
            version_range: range,
            version,
            dependency_trail: Vec::new(),
            available_versions: None,
        }
    }

    /// Parse `group:name:version`, `group:name:type:version` or
    /// `group:name:type:classifier:version`. The version may be a range.
    pub fn parse(s: &str) -> Result<Self, CoordinateError> {
        let parts: Vec<&str> = s.trim().split(':').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CoordinateError::Shape(s.to_string()));
        }
        let (group, name, kind, classifier, spec) = match parts.as_slice() {
            [g, n, v] => (*g, *n, DEFAULT_TYPE, None, *v),
            [g, n, t, v] => (*g, *n, *t, None, *v),
            [g, n, t, c, v] => (*g, *n, *t, Some(*c), *v),
            _ => return Err(CoordinateError::Shape(s.to_string())),
        };
        let range = VersionRange::parse(spec).map_err(|source| CoordinateError::Version {
            coordinate: s.to_string(),
            source,
        })?;
        let mut artifact = Self::new(group, name, range);
        artifact.kind = kind.to_string();
        artifact.classifier = classifier.map(str::to_string);
        Ok(artifact)
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_exclusion(mut self, exclusion: Exclusion) -> Self {
        self.exclusions.push(exclusion);
        self
    }

    pub fn conflict_id(&self) -> ConflictId {
        ConflictId::new(&self.group, &self.name, &self.kind, self.classifier.as_deref())
    }

    /// `conflict-id:version`, falling back to the range when no version is selected.
    pub fn id(&self) -> String {
        match self.version {
            Some(ref v) => format!("{}:{v}", self.conflict_id()),
            None => format!("{}:{}", self.conflict_id(), self.version_range),
        }
    }

    /// Scope used by mediation and filtering when none was declared.
    pub fn effective_scope(&self) -> Scope {
        self.scope.unwrap_or_default()
    }

    /// The selected concrete version, if one has been chosen.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn version_range(&self) -> &VersionRange {
        &self.version_range
    }

    /// Pin the artifact to `version`; the range collapses to that version.
    pub fn set_version(&mut self, version: &str) {
        self.version_range = VersionRange::pinned(MavenVersion::parse(version));
        self.version = Some(version.to_string());
    }

    /// Choose a concrete version while keeping the range.
    pub fn select_version(&mut self, version: &str) {
        self.version = Some(version.to_string());
    }

    /// Replace the range. The selected version becomes the range's
    /// recommendation, or is cleared when the range recommends nothing.
    pub fn set_version_range(&mut self, range: VersionRange) {
        self.version = range.recommended().map(|v| v.to_string());
        self.version_range = range;
    }

    pub fn dependency_trail(&self) -> &[String] {
        &self.dependency_trail
    }

    pub fn set_dependency_trail(&mut self, trail: Vec<String>) {
        self.dependency_trail = trail;
    }

    pub fn available_versions(&self) -> Option<&[MavenVersion]> {
        self.available_versions.as_deref()
    }

    pub fn set_available_versions(&mut self, versions: Vec<MavenVersion>) {
        self.available_versions = Some(versions);
    }

    /// True if one of this artifact's exclusions rules out `other`.
    pub fn excludes(&self, other: &Artifact) -> bool {
        self.exclusions.iter().any(|e| e.matches(other))
    }

    pub fn add_exclusions<'a>(&mut self, exclusions: impl IntoIterator<Item = &'a Exclusion>) {
        for exclusion in exclusions {
            if !self.exclusions.contains(exclusion) {
                self.exclusions.push(exclusion.clone());
            }
        }
    }
}

/// Artifacts are equal when identity and selected version agree.
impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.conflict_id() == other.conflict_id() && self.version == other.version
    }
}

impl Eq for Artifact {}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())?;
        if let Some(scope) = self.scope {
            write!(f, " ({scope})")?;
        }
        Ok(())
    }
}
