//! The resolution tree: an arena of nodes, each wrapping one artifact, plus
//! the per-conflict-id table the collector mediates against.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use trellis_core::artifact::{Artifact, ConflictId};
use trellis_core::filter::ArtifactFilter;
use trellis_core::repository::Repository;

/// Stable index of a node inside a [`ResolutionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Raised by [`ResolutionTree::expand`] when a child would repeat the
/// conflict id of one of its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cycle detected at {artifact} (via {})", .trail.join(" -> "))]
pub struct CycleDetected {
    pub artifact: String,
    pub trail: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResolutionNode {
    artifact: Artifact,
    parent: Option<NodeId>,
    depth: usize,
    ancestors: HashSet<ConflictId>,
    children: Option<Vec<NodeId>>,
    active: bool,
    repositories: Vec<Repository>,
}

impl ResolutionNode {
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Distance from the root; the root itself is at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Child nodes, empty until the node has been expanded.
    pub fn children(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or_default()
    }

    /// True once [`ResolutionTree::expand`] has populated the children.
    pub fn is_resolved(&self) -> bool {
        self.children.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Repositories to search for this node's own metadata.
    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }
}

/// Arena holding every node created during one collection run.
#[derive(Debug, Clone)]
pub struct ResolutionTree {
    nodes: Vec<ResolutionNode>,
}

impl ResolutionTree {
    /// Start a tree whose root wraps the originating artifact.
    pub fn new(root: Artifact, repositories: Vec<Repository>) -> Self {
        Self {
            nodes: vec![ResolutionNode {
                artifact: root,
                parent: None,
                depth: 0,
                ancestors: HashSet::new(),
                children: None,
                active: true,
                repositories,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &ResolutionNode {
        &self.nodes[id.0]
    }

    pub fn artifact(&self, id: NodeId) -> &Artifact {
        &self.nodes[id.0].artifact
    }

    /// Mutable access to a node's artifact, for mediation in place.
    pub fn artifact_mut(&mut self, id: NodeId) -> &mut Artifact {
        &mut self.nodes[id.0].artifact
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in creation order, root first.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Populate the children of `id`.
    ///
    /// Children excluded by the node's own exclusions or rejected by `filter`
    /// are dropped, the rest inherit the node's exclusions. If any remaining
    /// child shares a conflict id with the node or one of its ancestors,
    /// nothing is created and the cycle is reported. Expanding a node that is
    /// already resolved does nothing.
    pub fn expand(
        &mut self,
        id: NodeId,
        children: Vec<Artifact>,
        repositories: Vec<Repository>,
        filter: Option<&dyn ArtifactFilter>,
    ) -> Result<(), CycleDetected> {
        if self.node(id).is_resolved() {
            return Ok(());
        }

        let parent = self.node(id);
        let mut ancestors = parent.ancestors.clone();
        ancestors.insert(parent.artifact.conflict_id());

        let mut accepted = Vec::with_capacity(children.len());
        for mut child in children {
            if parent.artifact.excludes(&child) {
                tracing::debug!("{} excluded by {}", child.id(), parent.artifact.id());
                continue;
            }
            if filter.is_some_and(|f| !f.include(&child)) {
                tracing::trace!("{} rejected by filter", child.id());
                continue;
            }
            if ancestors.contains(&child.conflict_id()) {
                return Err(CycleDetected {
                    artifact: child.id(),
                    trail: self.trail(id),
                });
            }
            child.add_exclusions(&parent.artifact.exclusions);
            accepted.push(child);
        }

        let depth = parent.depth + 1;
        let mut ids = Vec::with_capacity(accepted.len());
        for artifact in accepted {
            ids.push(NodeId(self.nodes.len()));
            self.nodes.push(ResolutionNode {
                artifact,
                parent: Some(id),
                depth,
                ancestors: ancestors.clone(),
                children: None,
                active: true,
                repositories: repositories.clone(),
            });
        }
        self.nodes[id.0].children = Some(ids);
        Ok(())
    }

    /// Deactivate `id` and every descendant created so far. A disabled node
    /// never becomes active again.
    pub fn disable(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let node = &mut self.nodes[next.0];
            node.active = false;
            if let Some(ref children) = node.children {
                pending.extend(children.iter().copied());
            }
        }
    }

    /// Node ids from the root down to `id`, inclusive.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Artifact ids from the root down to `id`, inclusive.
    pub fn trail(&self, id: NodeId) -> Vec<String> {
        self.path(id)
            .into_iter()
            .map(|n| self.artifact(n).id())
            .collect()
    }

    pub fn is_child_of_root(&self, id: NodeId) -> bool {
        self.node(id).parent == Some(self.root())
    }

    /// True if every artifact on the path below the root passes `filter`.
    pub fn filter_trail(&self, id: NodeId, filter: Option<&dyn ArtifactFilter>) -> bool {
        let Some(filter) = filter else {
            return true;
        };
        self.path(id)
            .into_iter()
            .skip(1)
            .all(|n| filter.include(self.artifact(n)))
    }
}

/// Every node recorded per conflict id, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ResolutionTable {
    entries: HashMap<ConflictId, Vec<NodeId>>,
    order: Vec<ConflictId>,
}

impl ResolutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: ConflictId, id: NodeId) {
        match self.entries.get_mut(&key) {
            Some(nodes) => nodes.push(id),
            None => {
                self.order.push(key.clone());
                self.entries.insert(key, vec![id]);
            }
        }
    }

    /// Nodes recorded under `key` so far.
    pub fn get(&self, key: &ConflictId) -> &[NodeId] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// All recorded nodes, grouped by conflict id in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&ConflictId, &[NodeId])> {
        self.order
            .iter()
            .map(|key| (key, self.get(key)))
    }
}
