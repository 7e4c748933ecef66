//! Coordinator errors
//!
//! The only error surface the host sees. Renderer failures never get here;
//! they become the error block inside the rendered HTML.

use crate::config::ConfigError;
use xref_artifact::ArtifactId;
use xref_graph::GraphError;
use xref_index::IndexError;

/// Errors returned by [`crate::Coordinator`]
#[derive(Debug, thiserror::Error)]
pub enum XrefError {
    /// Another artifact in the same tool already owns the shorthand
    #[error("duplicate shorthand '{shorthand}' (owned by {existing})")]
    DuplicateShorthand {
        /// Rejected shorthand
        shorthand: String,
        /// Current owner
        existing: ArtifactId,
    },

    /// Graph rejected the write after retries; the write was rolled back
    #[error("reference graph rejected {artifact}: {source}")]
    GraphConsistency {
        /// Artifact being written
        artifact: ArtifactId,
        /// Last graph error
        #[source]
        source: GraphError,
    },

    /// Artifact is not in the index
    #[error("artifact not found: {0}")]
    NotFound(ArtifactId),

    /// Deadline expired before the write committed; nothing was changed
    #[error("{operation} on {artifact} exceeded its deadline")]
    DeadlineExceeded {
        /// Coordinator operation
        operation: &'static str,
        /// Artifact being written
        artifact: ArtifactId,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl XrefError {
    /// Map an index write error for `artifact`
    pub(crate) fn from_index(err: IndexError, artifact: &ArtifactId) -> Self {
        match err {
            IndexError::DuplicateShorthand {
                shorthand, existing, ..
            } => Self::DuplicateShorthand {
                shorthand,
                existing,
            },
            other => {
                tracing::debug!(artifact = %artifact, error = %other, "index write failed");
                Self::NotFound(artifact.clone())
            }
        }
    }

    /// Whether repeating the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }

    /// Whether the artifact's derived state must be treated as indeterminate
    /// until a later successful update
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::GraphConsistency { .. } | Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let id = ArtifactId::new("p1", "wiki", "w1");
        let deadline = XrefError::DeadlineExceeded {
            operation: "on_update",
            artifact: id.clone(),
        };
        assert!(deadline.is_retryable());
        assert!(!deadline.is_fatal());

        let graph = XrefError::GraphConsistency {
            artifact: id.clone(),
            source: GraphError::UnknownTarget(ArtifactId::new("p2", "wiki", "x")),
        };
        assert!(graph.is_fatal());
        assert!(!graph.is_retryable());
        assert!(!XrefError::NotFound(id).is_fatal());
    }

    #[test]
    fn index_duplicate_maps_to_duplicate_shorthand() {
        let id = ArtifactId::new("p1", "wiki", "w9");
        let err = XrefError::from_index(
            IndexError::DuplicateShorthand {
                project: "p1".into(),
                tool: "wiki".into(),
                shorthand: "Home".into(),
                existing: ArtifactId::new("p1", "wiki", "w1"),
            },
            &id,
        );
        assert_eq!(
            err.to_string(),
            "duplicate shorthand 'Home' (owned by p1/wiki/w1)"
        );
    }
}
