//! Observers of mediation decisions.
//!
//! Listeners only watch: the collector produces the same result with or
//! without them.

use trellis_core::range::VersionRange;
use trellis_core::scope::Scope;

use crate::node::{NodeId, ResolutionTree};

/// One decision taken by the collector.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionEvent {
    /// The node is about to be mediated.
    Tested { node: NodeId },
    /// The node survived mediation and is part of the tree.
    Include { node: NodeId },
    /// `omitted` lost to `kept` and was disabled. The farther declaration
    /// asked for `requested`; the nearer one's `resolved` version won.
    OmitForNearer {
        omitted: NodeId,
        kept: NodeId,
        requested: Option<String>,
        resolved: Option<String>,
    },
    /// Expanding `node` would have re-introduced `artifact`, one of its ancestors.
    OmitForCycle { node: NodeId, artifact: String },
    ManageVersion {
        node: NodeId,
        from: Option<String>,
        to: String,
    },
    ManageScope {
        node: NodeId,
        from: Option<Scope>,
        to: Scope,
    },
    /// The nearer node's scope was widened to the farther node's scope.
    UpdateScope { node: NodeId, from: Scope, to: Scope },
    /// Widening to `wanted` was refused because `node` is declared by the root.
    UpdateScopeBlocked { node: NodeId, wanted: Scope },
    /// The ranges of `node` and `previous` were intersected into `range`.
    RestrictRange {
        node: NodeId,
        previous: NodeId,
        range: VersionRange,
    },
    SelectVersionFromRange { node: NodeId, version: String },
    StartChildren { node: NodeId },
    FinishChildren { node: NodeId },
}

impl ResolutionEvent {
    /// The node the event is about.
    pub fn node(&self) -> NodeId {
        match *self {
            ResolutionEvent::Tested { node }
            | ResolutionEvent::Include { node }
            | ResolutionEvent::OmitForCycle { node, .. }
            | ResolutionEvent::ManageVersion { node, .. }
            | ResolutionEvent::ManageScope { node, .. }
            | ResolutionEvent::UpdateScope { node, .. }
            | ResolutionEvent::UpdateScopeBlocked { node, .. }
            | ResolutionEvent::RestrictRange { node, .. }
            | ResolutionEvent::SelectVersionFromRange { node, .. }
            | ResolutionEvent::StartChildren { node }
            | ResolutionEvent::FinishChildren { node } => node,
            ResolutionEvent::OmitForNearer { omitted, .. } => omitted,
        }
    }
}

/// Receives every [`ResolutionEvent`] together with the tree as it stands
/// when the event fires.
pub trait ResolutionListener {
    fn on_event(&mut self, tree: &ResolutionTree, event: &ResolutionEvent);
}

/// Writes every event to `tracing`, indented by tree depth.
///
/// Mediation outcomes go out at `debug`, traversal bookkeeping at `trace`.
#[derive(Debug, Default)]
pub struct TracingListener;

impl TracingListener {
    pub fn new() -> Self {
        Self
    }
}

impl ResolutionListener for TracingListener {
    fn on_event(&mut self, tree: &ResolutionTree, event: &ResolutionEvent) {
        let node = event.node();
        let indent = "  ".repeat(tree.node(node).depth());
        let artifact = tree.artifact(node);

        match event {
            ResolutionEvent::Tested { .. } => tracing::trace!("{indent}testing {artifact}"),
            ResolutionEvent::Include { .. } => tracing::debug!("{indent}{artifact}"),
            ResolutionEvent::StartChildren { .. } => tracing::trace!("{indent}{artifact} {{"),
            ResolutionEvent::FinishChildren { .. } => tracing::trace!("{indent}}}"),
            ResolutionEvent::OmitForNearer {
                kept,
                requested,
                resolved,
                ..
            } => tracing::debug!(
                "{indent}omitted {artifact} for nearer {} ({} -> {})",
                tree.artifact(*kept).id(),
                requested.as_deref().unwrap_or("?"),
                resolved.as_deref().unwrap_or("?")
            ),
            ResolutionEvent::OmitForCycle { artifact: cycle, .. } => {
                tracing::debug!("{indent}omitted {cycle} below {artifact} (cycle)")
            }
            ResolutionEvent::ManageVersion { from, to, .. } => tracing::debug!(
                "{indent}{artifact}: managed version {} -> {to}",
                from.as_deref().unwrap_or("(none)")
            ),
            ResolutionEvent::ManageScope { from, to, .. } => tracing::debug!(
                "{indent}{artifact}: managed scope {} -> {to}",
                from.map_or("(none)", |s| s.as_str())
            ),
            ResolutionEvent::UpdateScope { from, to, .. } => {
                tracing::debug!("{indent}{artifact}: scope {from} -> {to}")
            }
            ResolutionEvent::UpdateScopeBlocked { wanted, .. } => tracing::debug!(
                "{indent}{artifact}: not widening to {wanted}, declared by the project"
            ),
            ResolutionEvent::RestrictRange { previous, range, .. } => tracing::debug!(
                "{indent}{artifact}: range restricted to {range} (against {})",
                tree.artifact(*previous).id()
            ),
            ResolutionEvent::SelectVersionFromRange { version, .. } => {
                tracing::debug!("{indent}{artifact}: selected {version} from range")
            }
        }
    }
}
