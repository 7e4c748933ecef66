//! Project records
//!
//! Projects live inside a neighborhood and are addressed by a `/`-separated
//! shortname path, so `tools/cli` is a subproject of `tools`.

use serde::{Deserialize, Serialize};

/// Project known to the project directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Project {
    /// Opaque project id (first component of [`crate::ArtifactId`])
    pub id: String,
    /// Shortname path within the neighborhood
    pub shortname: String,
    /// Owning neighborhood
    pub neighborhood: String,
}

impl Project {
    /// Create project record
    #[inline]
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        shortname: impl Into<String>,
        neighborhood: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            shortname: shortname.into(),
            neighborhood: neighborhood.into(),
        }
    }

    /// Shortname of the parent project, if this is a subproject
    #[must_use]
    pub fn parent_shortname(&self) -> Option<&str> {
        parent_path(&self.shortname)
    }

    /// Nesting depth (top-level projects are depth 1)
    #[must_use]
    pub fn depth(&self) -> usize {
        self.shortname.split('/').filter(|s| !s.is_empty()).count()
    }
}

/// Parent of a `/`-separated shortname path
///
/// `a/b/c` → `a/b`; `a` → `None`.
#[must_use]
pub fn parent_path(shortname: &str) -> Option<&str> {
    shortname.rsplit_once('/').map(|(parent, _)| parent)
}

/// Climb `levels` ancestors from `shortname`
///
/// Climbing to the neighborhood root yields `Some("")`; climbing past it
/// yields `None`.
#[must_use]
pub fn ancestor_path(shortname: &str, levels: usize) -> Option<&str> {
    let mut current = shortname;
    for _ in 0..levels {
        if current.is_empty() {
            return None;
        }
        current = parent_path(current).unwrap_or("");
    }
    Some(current)
}
