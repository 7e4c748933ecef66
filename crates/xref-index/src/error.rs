//! Index errors

use xref_artifact::ArtifactId;

/// Errors raised by the artifact index and project directory
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// Another artifact in the same tool already owns the shorthand
    #[error("duplicate shorthand '{shorthand}' in {project}/{tool} (owned by {existing})")]
    DuplicateShorthand {
        project: String,
        tool: String,
        shorthand: String,
        existing: ArtifactId,
    },

    /// Another project already owns the shortname in the neighborhood
    #[error("duplicate project shortname '{shortname}' in neighborhood '{neighborhood}'")]
    DuplicateProject {
        neighborhood: String,
        shortname: String,
    },

    /// Lookup target is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Lookup matched more than one artifact
    #[error("ambiguous shorthand '{shorthand}': {} candidates", candidates.len())]
    Ambiguous {
        shorthand: String,
        candidates: Vec<ArtifactId>,
    },
}

impl IndexError {
    /// Create not-found error for an identity
    #[inline]
    pub fn not_found(what: impl ToString) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Whether the error rejects a write (as opposed to a failed lookup)
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateShorthand { .. } | Self::DuplicateProject { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_shorthand_display() {
        let err = IndexError::DuplicateShorthand {
            project: "p1".into(),
            tool: "wiki".into(),
            shorthand: "Home".into(),
            existing: ArtifactId::new("p1", "wiki", "w1"),
        };
        assert_eq!(
            err.to_string(),
            "duplicate shorthand 'Home' in p1/wiki (owned by p1/wiki/w1)"
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn not_found_is_not_conflict() {
        assert!(!IndexError::not_found("p1/wiki/x").is_conflict());
    }
}
