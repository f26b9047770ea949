//! Transitive dependency collection with Maven 2 mediation rules.
//!
//! [`collect`] walks the dependency tree depth-first, asking a
//! [`MetadataSource`] for each artifact's dependencies. Duplicates of the same
//! conflict id are mediated as they are discovered: version ranges are
//! intersected, the nearest declaration wins, a farther declaration can widen
//! the scope of a transitive one, and cycles prune their branch. Every
//! decision is reported to the registered [`ResolutionListener`]s.

pub mod collector;
pub mod conflict;
pub mod error;
pub mod graph;
pub mod listener;
pub mod node;
pub mod result;
pub mod source;

pub use collector::{collect, CollectRequest};
pub use error::ResolutionError;
pub use listener::{ResolutionEvent, ResolutionListener, TracingListener};
pub use result::ResolutionResult;
pub use source::{MetadataSource, StaticSource};
