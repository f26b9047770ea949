//! The collection engine: depth-first expansion of the dependency tree with
//! managed versions, range mediation, nearest-wins and scope widening.

use trellis_core::artifact::{Artifact, ConflictId};
use trellis_core::config::ResolverConfig;
use trellis_core::filter::ArtifactFilter;
use trellis_core::managed::ManagedVersions;
use trellis_core::range::VersionRange;
use trellis_core::repository::Repository;
use trellis_core::scope::Scope;

use crate::error::{OverConstrainedReason, ResolutionError};
use crate::listener::{ResolutionEvent, ResolutionListener};
use crate::node::{NodeId, ResolutionTable, ResolutionTree};
use crate::result::ResolutionResult;
use crate::source::{MetadataSource, Retrieved};

/// Everything [`collect`] needs besides the metadata source and listeners.
pub struct CollectRequest {
    /// The project being resolved; becomes the root of the tree.
    pub originating: Artifact,
    /// Dependencies declared directly by the project.
    pub dependencies: Vec<Artifact>,
    pub managed: ManagedVersions,
    pub local_repository: Repository,
    pub remote_repositories: Vec<Repository>,
    pub filter: Option<Box<dyn ArtifactFilter>>,
}

impl CollectRequest {
    /// A request with no dependencies, the default local repository and Maven Central.
    pub fn new(originating: Artifact) -> Self {
        let defaults = ResolverConfig::default();
        Self {
            originating,
            dependencies: Vec::new(),
            managed: ManagedVersions::new(),
            local_repository: defaults.local_repository,
            remote_repositories: defaults.remote_repositories,
            filter: None,
        }
    }

    /// Build a request from a loaded configuration: repositories, dependency
    /// management and the classpath scope filter all come from `config`.
    pub fn from_config(
        originating: Artifact,
        dependencies: Vec<Artifact>,
        config: &ResolverConfig,
    ) -> miette::Result<Self> {
        Ok(Self {
            originating,
            dependencies,
            managed: config.managed_versions()?,
            local_repository: config.local_repository.clone(),
            remote_repositories: config.remote_repositories.clone(),
            filter: config.filter(),
        })
    }

    pub fn with_dependency(mut self, artifact: Artifact) -> Self {
        self.dependencies.push(artifact);
        self
    }

    pub fn with_dependencies(mut self, artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        self.dependencies.extend(artifacts);
        self
    }

    pub fn with_managed(mut self, managed: ManagedVersions) -> Self {
        self.managed = managed;
        self
    }

    pub fn with_local_repository(mut self, repository: Repository) -> Self {
        self.local_repository = repository;
        self
    }

    pub fn with_remote_repositories(mut self, repositories: Vec<Repository>) -> Self {
        self.remote_repositories = repositories;
        self
    }

    pub fn with_filter(mut self, filter: impl ArtifactFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }
}

/// Collect the transitive dependencies of `request.originating`.
///
/// The tree is expanded depth-first in declaration order. Each new node is
/// mediated against every active node already recorded under its conflict
/// id before its own children are expanded. Cycles prune the offending
/// branch and never fail the run.
pub fn collect(
    request: CollectRequest,
    source: &dyn MetadataSource,
    listeners: &mut [&mut dyn ResolutionListener],
) -> Result<ResolutionResult, ResolutionError> {
    let CollectRequest {
        originating,
        dependencies,
        mut managed,
        local_repository,
        remote_repositories,
        filter,
    } = request;

    let own_id = originating.conflict_id();
    if managed.remove(&own_id).is_some() {
        tracing::debug!("Ignoring dependency management for {own_id}, it is being resolved");
    }

    let mut collector = Collector {
        tree: ResolutionTree::new(originating, remote_repositories.clone()),
        table: ResolutionTable::new(),
        managed,
        local: local_repository,
        source,
        filter: filter.as_deref(),
        listeners,
    };

    let root = collector.tree.root();
    if let Err(cycle) = collector
        .tree
        .expand(root, dependencies, remote_repositories, filter.as_deref())
    {
        tracing::warn!("{cycle}, dropping the direct dependencies");
        collector.emit(ResolutionEvent::OmitForCycle {
            node: root,
            artifact: cycle.artifact,
        });
    }
    collector.recurse(root)?;

    let Collector { tree, table, .. } = collector;
    let result = ResolutionResult::assemble(tree, &table, filter.as_deref());
    tracing::debug!("Collected {} artifacts", result.len());
    Ok(result)
}

struct Collector<'a, 'l> {
    tree: ResolutionTree,
    table: ResolutionTable,
    managed: ManagedVersions,
    local: Repository,
    source: &'a dyn MetadataSource,
    filter: Option<&'a dyn ArtifactFilter>,
    listeners: &'a mut [&'l mut dyn ResolutionListener],
}

impl Collector<'_, '_> {
    fn emit(&mut self, event: ResolutionEvent) {
        for listener in self.listeners.iter_mut() {
            listener.on_event(&self.tree, &event);
        }
    }

    fn recurse(&mut self, node: NodeId) -> Result<(), ResolutionError> {
        self.emit(ResolutionEvent::Tested { node });

        let key = self.tree.artifact(node).conflict_id();
        self.manage(node, &key);

        let previous = self.table.get(&key).to_vec();
        for prev in previous {
            if !self.tree.node(prev).is_active() {
                continue;
            }
            self.mediate_range(prev, node)?;
            self.resolve_conflict(prev, node);
        }

        self.table.record(key, node);

        if !self.tree.node(node).is_active() {
            return Ok(());
        }
        self.emit(ResolutionEvent::Include { node });

        // System dependencies live outside the repository and bring nothing along.
        if self.tree.artifact(node).effective_scope() == Scope::System {
            return Ok(());
        }

        self.emit(ResolutionEvent::StartChildren { node });
        let children = self.tree.node(node).children().to_vec();
        for child in children {
            let state = self.tree.node(child);
            if state.is_resolved() || !state.is_active() {
                continue;
            }
            // Optional dependencies of dependencies stay as leaves.
            if state.artifact().optional && !self.tree.is_child_of_root(child) {
                continue;
            }
            if self.expand_child(node, child)? {
                self.recurse(child)?;
            }
        }
        self.emit(ResolutionEvent::FinishChildren { node });
        Ok(())
    }

    /// Settle the child's version, fetch its metadata and expand it.
    /// Returns false when the child must not be recursed into.
    fn expand_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool, ResolutionError> {
        let trail = self.tree.trail(parent);
        self.tree.artifact_mut(child).set_dependency_trail(trail);

        let key = self.tree.artifact(child).conflict_id();
        self.manage(child, &key);

        if self.tree.artifact(child).version().is_none() {
            let version = self.select_from_range(child)?;
            self.tree.artifact_mut(child).select_version(&version);
            self.emit(ResolutionEvent::SelectVersionFromRange {
                node: child,
                version,
            });
        }

        let repositories = self.tree.node(child).repositories().to_vec();
        let retrieved = self
            .source
            .retrieve(self.tree.artifact(child), &self.local, &repositories)
            .map_err(|source| ResolutionError::MetadataRetrieval {
                artifact: self.tree.artifact(child).id(),
                trail: self.tree.trail(child),
                source,
            })?;

        let group = match retrieved {
            Retrieved::Found(group) => group,
            Retrieved::Excluded => {
                tracing::debug!(
                    "{} is relocated to an excluded artifact, skipping",
                    self.tree.artifact(child).id()
                );
                return Ok(false);
            }
        };

        match self
            .tree
            .expand(child, group.artifacts, group.repositories, self.filter)
        {
            Ok(()) => Ok(true),
            Err(cycle) => {
                tracing::warn!("{cycle}");
                self.emit(ResolutionEvent::OmitForCycle {
                    node: child,
                    artifact: cycle.artifact,
                });
                Ok(false)
            }
        }
    }

    /// Apply dependency management to `id`.
    ///
    /// Transitive dependencies are always overridden. A dependency declared
    /// by the project only takes the managed version or scope when it does
    /// not state its own.
    fn manage(&mut self, id: NodeId, key: &ConflictId) {
        let Some(managed) = self.managed.get(key).cloned() else {
            return;
        };
        let direct = self.tree.is_child_of_root(id);

        if let Some(version) = managed.version {
            let current = self.tree.artifact(id).version().map(str::to_string);
            if !direct || current.is_none() {
                self.tree.artifact_mut(id).set_version(&version);
                if current.as_deref() != Some(version.as_str()) {
                    self.emit(ResolutionEvent::ManageVersion {
                        node: id,
                        from: current,
                        to: version,
                    });
                }
            }
        }

        if let Some(scope) = managed.scope {
            let current = self.tree.artifact(id).scope;
            if !direct || current.is_none() {
                self.tree.artifact_mut(id).scope = Some(scope);
                if current != Some(scope) {
                    self.emit(ResolutionEvent::ManageScope {
                        node: id,
                        from: current,
                        to: scope,
                    });
                }
            }
        }

        self.tree
            .artifact_mut(id)
            .add_exclusions(&managed.exclusions);
    }

    /// Intersect the ranges of two nodes sharing a conflict id. Each side
    /// keeps its own recommendation when it still fits; a side left without
    /// a version selects one from its available versions.
    ///
    /// Nodes pinned by management or scope widening are not mediated.
    fn mediate_range(&mut self, previous: NodeId, node: NodeId) -> Result<(), ResolutionError> {
        let previous_range = self.tree.artifact(previous).version_range().clone();
        let current_range = self.tree.artifact(node).version_range().clone();
        if previous_range.restrictions().is_empty() || current_range.restrictions().is_empty() {
            return Ok(());
        }
        let restricted = previous_range.restrict(&current_range);

        if previous_range.has_restrictions() || current_range.has_restrictions() {
            let range = restricted.clone().unwrap_or_default();
            self.emit(ResolutionEvent::RestrictRange {
                node,
                previous,
                range,
            });
        }

        for (id, own) in [(previous, &previous_range), (node, &current_range)] {
            // Without a common version a side only keeps what its own range accepts.
            let range = match restricted {
                Ok(ref r) => r.clone().prefer(own.recommended()),
                Err(ref e) => {
                    tracing::debug!("{e}");
                    own.recommended()
                        .cloned()
                        .map(VersionRange::pinned)
                        .unwrap_or_default()
                }
            };
            self.tree.artifact_mut(id).set_version_range(range);

            if self.tree.artifact(id).version().is_none() {
                let version = self.select_from_range(id)?;
                self.tree.artifact_mut(id).select_version(&version);
                self.emit(ResolutionEvent::SelectVersionFromRange { node: id, version });
            }
        }
        Ok(())
    }

    /// Nearest wins; ties go to the node recorded first. When the farther
    /// node needs a wider scope, it survives with the nearer node's version.
    fn resolve_conflict(&mut self, previous: NodeId, node: NodeId) {
        let (nearest, farthest) =
            if self.tree.node(previous).depth() <= self.tree.node(node).depth() {
                (previous, node)
            } else {
                (node, previous)
            };
        let resolved = self.tree.artifact(nearest).version().map(str::to_string);
        let requested = self.tree.artifact(farthest).version().map(str::to_string);

        let (omitted, kept) = if self.widen_scope(nearest, farthest) {
            self.tree.disable(nearest);
            if let Some(version) = self.tree.artifact(nearest).version().map(str::to_string) {
                self.tree.artifact_mut(farthest).set_version(&version);
            }
            (nearest, farthest)
        } else {
            self.tree.disable(farthest);
            (farthest, nearest)
        };

        if requested != resolved {
            self.emit(ResolutionEvent::OmitForNearer {
                omitted,
                kept,
                requested,
                resolved,
            });
        }
    }

    /// Decide whether the nearer node must take the farther node's scope,
    /// and apply it. Dependencies declared by the project keep their scope.
    fn widen_scope(&mut self, nearest: NodeId, farthest: NodeId) -> bool {
        let near = self.tree.artifact(nearest).effective_scope();
        let far = self.tree.artifact(farthest).effective_scope();

        let widen = match far {
            Scope::Runtime => matches!(near, Scope::Test | Scope::Provided),
            Scope::Compile => near != Scope::Compile,
            _ => false,
        };
        if !widen {
            return false;
        }

        if self.tree.node(nearest).depth() < 2 {
            self.emit(ResolutionEvent::UpdateScopeBlocked {
                node: nearest,
                wanted: far,
            });
            return false;
        }

        self.emit(ResolutionEvent::UpdateScope {
            node: nearest,
            from: near,
            to: far,
        });
        self.tree.artifact_mut(nearest).scope = Some(far);
        true
    }

    /// Pick the highest available version inside the node's range, fetching
    /// and caching the available versions on first use.
    fn select_from_range(&mut self, id: NodeId) -> Result<String, ResolutionError> {
        if self.tree.artifact(id).available_versions().is_none() {
            let repositories = self.tree.node(id).repositories().to_vec();
            let mut versions = self
                .source
                .retrieve_available_versions(self.tree.artifact(id), &self.local, &repositories)
                .map_err(|source| ResolutionError::MetadataRetrieval {
                    artifact: self.tree.artifact(id).id(),
                    trail: self.tree.trail(id),
                    source,
                })?;
            versions.sort();
            self.tree.artifact_mut(id).set_available_versions(versions);
        }

        let artifact = self.tree.artifact(id);
        let available = artifact.available_versions().unwrap_or_default();
        if let Some(version) = artifact.version_range().match_version(available) {
            tracing::debug!("Selected {version} for {}", artifact.conflict_id());
            return Ok(version.to_string());
        }

        let reason = if available.is_empty() {
            OverConstrainedReason::NoVersionsAvailable
        } else {
            OverConstrainedReason::NoMatchingVersion
        };
        Err(ResolutionError::OverConstrainedVersion {
            artifact: artifact.conflict_id().to_string(),
            range: artifact.version_range().to_string(),
            available: available.iter().map(ToString::to_string).collect(),
            reason,
            trail: self.tree.trail(id),
        })
    }
}
