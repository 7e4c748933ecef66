//! Host capability callbacks
//!
//! The host application owns permissions, URL layout and display names. The
//! engine only needs these three capabilities, registered at construction.

use crate::artifact::{Artifact, ArtifactKind};
use crate::context::Viewer;
use std::fmt::Debug;

/// Capabilities the host application provides for its artifacts
///
/// Implementations must be deterministic for a given descriptor: rendering
/// is required to be a pure function of its inputs and the index state.
pub trait ArtifactHost: Send + Sync + Debug {
    /// Whether `viewer` may read `artifact`
    ///
    /// Default: everything is readable.
    fn can_read(&self, _viewer: &Viewer, _artifact: &Artifact) -> bool {
        true
    }

    /// Canonical URL of `artifact`
    fn canonical_url(&self, artifact: &Artifact) -> String;

    /// Short display name used as link label
    fn short_label(&self, artifact: &Artifact) -> String;
}

/// Path-based host used when the application has no URL scheme of its own
///
/// URLs are `/{project}/{tool}/{slug}` where the slug is the page title for
/// wiki pages, the bare number for tickets and the artifact id otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHost;

impl DefaultHost {
    /// Create default host
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn slug(artifact: &Artifact) -> String {
        let raw = match artifact.kind() {
            ArtifactKind::WikiPage => artifact.shorthand(),
            ArtifactKind::Ticket => artifact.shorthand().trim_start_matches('#'),
            _ => artifact.id().artifact(),
        };
        raw.replace(' ', "%20")
    }
}

impl ArtifactHost for DefaultHost {
    fn canonical_url(&self, artifact: &Artifact) -> String {
        let id = artifact.id();
        format!("/{}/{}/{}", id.project(), id.tool(), Self::slug(artifact))
    }

    fn short_label(&self, artifact: &Artifact) -> String {
        artifact.shorthand().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactId;

    #[test]
    fn wiki_url_uses_title() {
        let page = Artifact::wiki_page(ArtifactId::new("p2", "wiki", "w2"), "Home");
        assert_eq!(DefaultHost.canonical_url(&page), "/p2/wiki/Home");
        assert_eq!(DefaultHost.short_label(&page), "Home");
    }

    #[test]
    fn ticket_url_uses_number() {
        let t = Artifact::ticket(ArtifactId::new("p1", "bugs", "t-7"), 7);
        assert_eq!(DefaultHost.canonical_url(&t), "/p1/bugs/7");
        assert_eq!(DefaultHost.short_label(&t), "#7");
    }

    #[test]
    fn other_kinds_use_artifact_id() {
        let post_id = ArtifactId::new("p1", "blog", "b-3");
        let post = Artifact::new(post_id, "launch", ArtifactKind::BlogPost);
        assert_eq!(DefaultHost.canonical_url(&post), "/p1/blog/b-3");
    }

    #[test]
    fn default_host_reads_everything() {
        let page = Artifact::wiki_page(ArtifactId::new("p2", "wiki", "w2"), "Home");
        assert!(DefaultHost.can_read(&Viewer::anonymous(), &page));
    }
}
