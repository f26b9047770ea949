//! Version conflict reporting, built by listening to a collection run.

use std::fmt;

use crate::listener::{ResolutionEvent, ResolutionListener};
use crate::node::ResolutionTree;

/// A report of all version conflicts encountered during resolution.
#[derive(Debug, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// A single version conflict where multiple versions of the same artifact
/// were requested but only one was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConflict {
    pub group: String,
    pub name: String,
    pub requested: String,
    pub resolved: String,
    pub reason: String,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: VersionConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }
}

impl ResolutionListener for ConflictReport {
    fn on_event(&mut self, tree: &ResolutionTree, event: &ResolutionEvent) {
        let ResolutionEvent::OmitForNearer {
            omitted,
            kept,
            requested,
            resolved,
        } = event
        else {
            return;
        };
        let lost = tree.artifact(*omitted);
        let won = tree.artifact(*kept);
        let (lost_depth, won_depth) = (tree.node(*omitted).depth(), tree.node(*kept).depth());
        let reason = if won_depth <= lost_depth {
            format!("nearest wins (depth {won_depth} vs {lost_depth})")
        } else {
            format!("scope {} required (depth {won_depth})", won.effective_scope())
        };
        self.add(VersionConflict {
            group: lost.group.clone(),
            name: lost.name.clone(),
            requested: requested.as_deref().unwrap_or("?").to_string(),
            resolved: resolved.as_deref().unwrap_or("?").to_string(),
            reason,
        });
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(
                f,
                "  {}:{} requested {} but resolved {} ({})",
                c.group, c.name, c.requested, c.resolved, c.reason
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} -> {} ({})",
            self.group, self.name, self.requested, self.resolved, self.reason
        )
    }
}
