use miette::Diagnostic;
use thiserror::Error;

use crate::source::MetadataError;

/// Why no version could be chosen for a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverConstrainedReason {
    /// The repositories list no version at all.
    NoVersionsAvailable,
    /// Versions exist, but none lies inside the range.
    NoMatchingVersion,
}

/// Fatal resolution failures. Both variants carry the dependency trail of
/// the node being processed, root first.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolutionError {
    #[error("{}", over_constrained_message(.artifact, .range, .available, .reason))]
    #[diagnostic(
        code(trellis::over_constrained),
        help("Relax the version range or pin the dependency through dependency management")
    )]
    OverConstrainedVersion {
        artifact: String,
        range: String,
        available: Vec<String>,
        reason: OverConstrainedReason,
        trail: Vec<String>,
    },

    #[error("Unable to get dependency information for {artifact}: {source}")]
    #[diagnostic(code(trellis::metadata))]
    MetadataRetrieval {
        artifact: String,
        trail: Vec<String>,
        #[source]
        source: MetadataError,
    },
}

impl ResolutionError {
    pub fn trail(&self) -> &[String] {
        match self {
            ResolutionError::OverConstrainedVersion { trail, .. }
            | ResolutionError::MetadataRetrieval { trail, .. } => trail,
        }
    }
}

fn over_constrained_message(
    artifact: &str,
    range: &str,
    available: &[String],
    reason: &OverConstrainedReason,
) -> String {
    match reason {
        OverConstrainedReason::NoVersionsAvailable => format!(
            "No versions are present in the repository for {artifact} with a range {range}"
        ),
        OverConstrainedReason::NoMatchingVersion => format!(
            "Couldn't find a version in [{}] to match range {range} for {artifact}",
            available.join(", ")
        ),
    }
}
