//! Graph view of a resolution result, for rendering and path queries.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use trellis_core::artifact::Artifact;
use trellis_core::scope::Scope;

/// A node in the resolved dependency graph.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResolvedNode {
    pub group: String,
    pub name: String,
    pub version: String,
    pub scope: Scope,
}

impl ResolvedNode {
    /// `group:name` identifier (without version).
    pub fn key(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }
}

impl From<&Artifact> for ResolvedNode {
    fn from(artifact: &Artifact) -> Self {
        Self {
            group: artifact.group.clone(),
            name: artifact.name.clone(),
            version: artifact
                .version()
                .map(str::to_string)
                .unwrap_or_else(|| artifact.version_range().to_string()),
            scope: artifact.effective_scope(),
        }
    }
}

impl fmt::Display for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

/// Edge label in the dependency graph.
#[derive(Debug, Clone)]
pub struct DepEdge {
    pub scope: Scope,
    pub optional: bool,
}

/// A resolved dependency graph backed by petgraph.
pub struct DependencyGraph {
    graph: DiGraph<ResolvedNode, DepEdge>,
    /// Lookup from `group:name` to node index.
    index: HashMap<String, NodeIndex>,
    pub root: Option<NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            root: None,
        }
    }

    /// Add or retrieve a node. If the key already exists, returns the existing index.
    pub fn add_node(&mut self, node: ResolvedNode) -> NodeIndex {
        let key = node.key();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    pub fn set_root(&mut self, idx: NodeIndex) {
        self.root = Some(idx);
    }

    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: DepEdge) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, edge);
        }
    }

    /// Look up a node by `group:name`.
    pub fn find(&self, key: &str) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &ResolvedNode {
        &self.graph[idx]
    }

    /// All resolved nodes (excluding root).
    pub fn all_nodes(&self) -> Vec<&ResolvedNode> {
        self.graph
            .node_indices()
            .filter(|&idx| Some(idx) != self.root)
            .map(|idx| &self.graph[idx])
            .collect()
    }

    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut deps: Vec<(NodeIndex, &DepEdge)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        // petgraph walks edges newest first
        deps.reverse();
        deps
    }

    /// Render the tree below the root, one section per scope when the
    /// project pulls in more than plain compile dependencies.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let Some(root) = self.root else {
            return output;
        };
        output.push_str(&format!("{}\n", self.graph[root]));

        const SECTIONS: [Scope; 5] = [
            Scope::Compile,
            Scope::Runtime,
            Scope::Provided,
            Scope::System,
            Scope::Test,
        ];
        let deps = self.dependencies_of(root);
        let sections: Vec<(Scope, Vec<NodeIndex>)> = SECTIONS
            .iter()
            .map(|&scope| {
                let members = deps
                    .iter()
                    .filter(|(_, edge)| edge.scope == scope)
                    .map(|(idx, _)| *idx)
                    .collect::<Vec<_>>();
                (scope, members)
            })
            .filter(|(_, members)| !members.is_empty())
            .collect();

        let show_headers =
            sections.len() > 1 || sections.iter().any(|(scope, _)| *scope != Scope::Compile);
        let mut visited = HashSet::new();
        visited.insert(root);

        let total = sections.len();
        for (section, (scope, members)) in sections.iter().enumerate() {
            if show_headers {
                output.push_str(&format!("[{scope}]\n"));
            }
            let is_last_section = section + 1 == total;
            for (i, idx) in members.iter().enumerate() {
                let is_last = i + 1 == members.len() && is_last_section;
                let mut branch = Branch {
                    output: &mut output,
                    max_depth,
                    visited: &mut visited,
                };
                self.print_subtree(&mut branch, *idx, "", is_last, 1);
            }
        }

        output
    }

    fn print_subtree(
        &self,
        branch: &mut Branch<'_>,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        branch
            .output
            .push_str(&format!("{prefix}{connector}{node}"));
        if node.scope != Scope::Compile {
            branch.output.push_str(&format!(" ({})", node.scope));
        }
        branch.output.push('\n');

        if branch.max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        if !branch.visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, _)) in deps.iter().enumerate() {
            self.print_subtree(branch, *child, &child_prefix, i + 1 == count, depth + 1);
        }

        branch.visited.remove(&idx);
    }

    /// Find the path from root to a specific dependency.
    ///
    /// Accepts either `group:name` or just `name`.
    pub fn find_path(&self, target_key: &str) -> Option<Vec<&ResolvedNode>> {
        let root = self.root?;
        let target = self.resolve_key(target_key)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    fn resolve_key(&self, key: &str) -> Option<NodeIndex> {
        if let Some(&idx) = self.index.get(key) {
            return Some(idx);
        }
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].name == key)
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (child, _) in self.dependencies_of(current) {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Number of nodes (excluding root).
    pub fn len(&self) -> usize {
        let total = self.graph.node_count();
        if self.root.is_some() {
            total.saturating_sub(1)
        } else {
            total
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

struct Branch<'a> {
    output: &'a mut String,
    max_depth: Option<usize>,
    visited: &'a mut HashSet<NodeIndex>,
}
