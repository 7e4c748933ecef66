//! Explicit resolution context
//!
//! Replaces request-scoped globals: every render and every coordinator call
//! receives the neighborhood, project and tool it runs in.

use crate::artifact::ArtifactId;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Identity of the user a render is performed for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewer(String);

impl Viewer {
    /// Create viewer from user name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Anonymous viewer
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self("*anonymous".to_string())
    }

    /// User name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this is the anonymous viewer
    #[inline]
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0 == "*anonymous"
    }
}

impl Display for Viewer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context a shortlink is resolved and rendered in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactContext {
    /// Current neighborhood
    pub neighborhood: String,
    /// Current project id
    pub project: String,
    /// Current tool mount
    pub tool: String,
    /// Artifact being rendered, if any (used for self-link detection and base URL)
    pub current: Option<ArtifactId>,
    /// Viewer whose read permission filters resolution
    pub viewer: Option<Viewer>,
    /// Base URL for relative links; derived from `current` when absent
    pub base_url: Option<String>,
}

impl ArtifactContext {
    /// Create context for a tool
    #[must_use]
    pub fn new(
        neighborhood: impl Into<String>,
        project: impl Into<String>,
        tool: impl Into<String>,
    ) -> Self {
        Self {
            neighborhood: neighborhood.into(),
            project: project.into(),
            tool: tool.into(),
            current: None,
            viewer: None,
            base_url: None,
        }
    }

    /// Context for rendering a specific artifact
    #[must_use]
    pub fn for_artifact(neighborhood: impl Into<String>, id: &ArtifactId) -> Self {
        Self::new(neighborhood, id.project(), id.tool()).with_current(id.clone())
    }

    /// With current artifact
    #[inline]
    #[must_use]
    pub fn with_current(mut self, id: ArtifactId) -> Self {
        self.current = Some(id);
        self
    }

    /// With viewer
    #[inline]
    #[must_use]
    pub fn with_viewer(mut self, viewer: Viewer) -> Self {
        self.viewer = Some(viewer);
        self
    }

    /// With explicit base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Whether `id` is the artifact being rendered
    #[inline]
    #[must_use]
    pub fn is_current(&self, id: &ArtifactId) -> bool {
        self.current.as_ref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_artifact_copies_project_and_tool() {
        let id = ArtifactId::new("p1", "wiki", "w1");
        let ctx = ArtifactContext::for_artifact("p", &id);
        assert_eq!(ctx.project, "p1");
        assert_eq!(ctx.tool, "wiki");
        assert!(ctx.is_current(&id));
        assert!(!ctx.is_current(&ArtifactId::new("p1", "wiki", "w2")));
    }

    #[test]
    fn anonymous_viewer() {
        assert!(Viewer::anonymous().is_anonymous());
        assert!(!Viewer::new("alice").is_anonymous());
    }
}
