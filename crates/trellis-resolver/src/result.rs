//! The flattened outcome of a collection run.

use std::collections::{HashMap, HashSet};

use trellis_core::artifact::{Artifact, ConflictId};
use trellis_core::filter::ArtifactFilter;

use crate::graph::{DepEdge, DependencyGraph, ResolvedNode};
use crate::node::{NodeId, ResolutionNode, ResolutionTable, ResolutionTree};

/// Resolved nodes, at most one per conflict id, in discovery order.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    tree: ResolutionTree,
    nodes: Vec<NodeId>,
}

impl ResolutionResult {
    /// Keep every active node below the root whose path passes `filter`.
    /// Optional dependencies only count when the project declares them.
    pub(crate) fn assemble(
        mut tree: ResolutionTree,
        table: &ResolutionTable,
        filter: Option<&dyn ArtifactFilter>,
    ) -> Self {
        let root = tree.root();
        let mut seen: HashSet<&ConflictId> = HashSet::new();
        let mut nodes = Vec::new();

        for (key, ids) in table.iter() {
            for &id in ids {
                if id == root || !tree.node(id).is_active() {
                    continue;
                }
                if !tree.filter_trail(id, filter) {
                    continue;
                }
                if tree.artifact(id).optional && !tree.is_child_of_root(id) {
                    continue;
                }
                if !seen.insert(key) {
                    tracing::debug!("Dropping duplicate {}", tree.artifact(id).id());
                    continue;
                }
                let trail = tree.trail(id);
                tree.artifact_mut(id).set_dependency_trail(trail);
                nodes.push(id);
            }
        }

        Self { tree, nodes }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ResolutionNode> {
        self.nodes.iter().map(|&id| self.tree.node(id))
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The resolved artifacts with their final versions, scopes and trails.
    pub fn artifacts(&self) -> Vec<&Artifact> {
        self.nodes.iter().map(|&id| self.tree.artifact(id)).collect()
    }

    pub fn into_artifacts(self) -> Vec<Artifact> {
        let Self { tree, nodes } = self;
        nodes.into_iter().map(|id| tree.artifact(id).clone()).collect()
    }

    /// Look up a resolved artifact by group and name.
    pub fn find(&self, group: &str, name: &str) -> Option<&Artifact> {
        self.artifacts()
            .into_iter()
            .find(|a| a.group == group && a.name == name)
    }

    /// The full tree, including the nodes mediation disabled.
    pub fn tree(&self) -> &ResolutionTree {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build a graph of the resolved artifacts under the originating artifact.
    ///
    /// Each artifact hangs below its closest resolved ancestor in the tree.
    pub fn graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        let root = self.tree.root();
        let root_idx = graph.add_node(ResolvedNode::from(self.tree.artifact(root)));
        graph.set_root(root_idx);

        let mut indices = HashMap::new();
        indices.insert(root, root_idx);
        for &id in &self.nodes {
            indices.insert(id, graph.add_node(ResolvedNode::from(self.tree.artifact(id))));
        }

        for &id in &self.nodes {
            let mut parent = self.tree.node(id).parent();
            while let Some(p) = parent {
                if indices.contains_key(&p) {
                    break;
                }
                parent = self.tree.node(p).parent();
            }
            let (Some(&from), Some(&to)) = (parent.and_then(|p| indices.get(&p)), indices.get(&id))
            else {
                continue;
            };
            let artifact = self.tree.artifact(id);
            graph.add_edge(
                from,
                to,
                DepEdge {
                    scope: artifact.effective_scope(),
                    optional: artifact.optional,
                },
            );
        }
        graph
    }
}
