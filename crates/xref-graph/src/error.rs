//! Graph errors

use xref_artifact::ArtifactId;

/// Errors raised by [`crate::ReferenceGraph`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Edge endpoint is not a node of the graph
    #[error("unknown reference target: {0}")]
    UnknownTarget(ArtifactId),

    /// Forward and reverse edges disagree
    #[error("reference graph inconsistent: {0}")]
    Consistency(String),
}

impl GraphError {
    /// Offending target of an [`GraphError::UnknownTarget`]
    #[must_use]
    pub fn unknown_target(&self) -> Option<&ArtifactId> {
        match self {
            Self::UnknownTarget(id) => Some(id),
            Self::Consistency(_) => None,
        }
    }
}
