//! Reference resolver
//!
//! Turns a raw shortlink plus an [`ArtifactContext`] into a concrete
//! artifact by defaulting the missing hints from the context and asking the
//! [`ArtifactIndex`].

use crate::index::ArtifactIndex;
use xref_artifact::{
    ancestor_path, parent_path, Artifact, ArtifactContext, ArtifactHost, ArtifactId,
};
use xref_shortlink::{ProjectRef, Shortlink, ShortlinkError};

/// Outcome of resolving one shortlink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one readable, live artifact matched
    Resolved(Artifact),

    /// Nothing usable matched
    Unresolved(Unresolved),

    /// More than one artifact matched; callers treat this as unresolved
    Ambiguous(Vec<ArtifactId>),
}

impl Resolution {
    /// Resolved artifact, if any
    #[inline]
    #[must_use]
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Resolved(artifact) => Some(artifact),
            _ => None,
        }
    }

    /// Whether resolution succeeded
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Why a shortlink did not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    /// The text does not follow the shortlink grammar
    Malformed(ShortlinkError),

    /// The project hint climbs above the neighborhood root
    NoSuchProject,

    /// No artifact matches
    NotFound,

    /// Every match is flagged deleted
    Deleted,

    /// The viewer may not read the match
    Forbidden,
}

/// Shortlink resolver over an index and the host's callbacks
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    index: &'a ArtifactIndex,
    host: &'a dyn ArtifactHost,
}

impl<'a> Resolver<'a> {
    /// Create resolver
    #[inline]
    #[must_use]
    pub fn new(index: &'a ArtifactIndex, host: &'a dyn ArtifactHost) -> Self {
        Self { index, host }
    }

    /// Resolve raw shortlink text (with or without brackets)
    #[must_use]
    pub fn resolve(&self, raw: &str, ctx: &ArtifactContext) -> Resolution {
        match Shortlink::parse(raw) {
            Ok(link) => self.resolve_link(&link, ctx),
            Err(err) => Resolution::Unresolved(Unresolved::Malformed(err)),
        }
    }

    /// Resolve a parsed shortlink
    #[must_use]
    pub fn resolve_link(&self, link: &Shortlink, ctx: &ArtifactContext) -> Resolution {
        let Some(project) = self.target_project(link, ctx) else {
            return Resolution::Unresolved(Unresolved::NoSuchProject);
        };
        let tool = link.tool().unwrap_or(&ctx.tool);
        let shorthand = link.shorthand();

        if let Some(by_id) = self.index.get(&ArtifactId::new(&project, tool, shorthand)) {
            if by_id.is_deleted() {
                return Resolution::Unresolved(Unresolved::Deleted);
            }
            return self.check_readable(by_id, ctx);
        }

        let mut hits = self.index.find_by_shorthand(&project, tool, shorthand);
        if hits.is_empty() {
            return Resolution::Unresolved(Unresolved::NotFound);
        }
        hits.retain(|a| !a.is_deleted());
        if hits.is_empty() {
            return Resolution::Unresolved(Unresolved::Deleted);
        }
        if hits.len() > 1 {
            let candidates: Vec<ArtifactId> = hits.iter().map(|a| a.id().clone()).collect();
            tracing::warn!(
                shortlink = %link,
                project = %ctx.project,
                tool = %ctx.tool,
                candidates = ?candidates,
                "ambiguous shortlink treated as unresolved"
            );
            return Resolution::Ambiguous(candidates);
        }

        self.check_readable(hits.remove(0), ctx)
    }

    fn check_readable(&self, target: Artifact, ctx: &ArtifactContext) -> Resolution {
        if let Some(viewer) = &ctx.viewer {
            if !self.host.can_read(viewer, &target) {
                return Resolution::Unresolved(Unresolved::Forbidden);
            }
        }
        Resolution::Resolved(target)
    }

    /// Project id the shortlink points into
    ///
    /// `None` when the project hint climbs above the neighborhood root.
    fn target_project(&self, link: &Shortlink, ctx: &ArtifactContext) -> Option<String> {
        let Some(project_ref) = link.project() else {
            return Some(ctx.project.clone());
        };

        let directory = self.index.projects();
        let (current_shortname, current_nbhd) = directory
            .get(&ctx.project)
            .map_or_else(
                || (ctx.project.clone(), ctx.neighborhood.clone()),
                |p| (p.shortname, p.neighborhood),
            );
        let neighborhood = link.neighborhood().map_or(current_nbhd, str::to_string);

        let shortname = match project_ref {
            ProjectRef::Parent => parent_path(&current_shortname)?.to_string(),
            ProjectRef::Grandparent => {
                let grand = ancestor_path(&current_shortname, 2)?;
                if grand.is_empty() {
                    return None;
                }
                grand.to_string()
            }
            ProjectRef::Path { ups, segments } => {
                let tail = segments.join("/");
                if *ups == 0 {
                    tail
                } else {
                    match ancestor_path(&current_shortname, *ups)? {
                        "" => tail,
                        base => format!("{base}/{tail}"),
                    }
                }
            }
        };

        Some(directory.resolve_id(&neighborhood, &shortname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xref_artifact::{DefaultHost, Project, Viewer};

    #[derive(Debug)]
    struct NoTickets;

    impl ArtifactHost for NoTickets {
        fn can_read(&self, viewer: &Viewer, artifact: &Artifact) -> bool {
            !viewer.is_anonymous() || artifact.id().tool() != "tickets"
        }

        fn canonical_url(&self, artifact: &Artifact) -> String {
            DefaultHost.canonical_url(artifact)
        }

        fn short_label(&self, artifact: &Artifact) -> String {
            DefaultHost.short_label(artifact)
        }
    }

    fn seeded() -> ArtifactIndex {
        let index = ArtifactIndex::new();
        index.projects().register(Project::new("p1", "p1", "p")).unwrap();
        index.projects().register(Project::new("p2", "p2", "p")).unwrap();
        index.projects().register(Project::new("sub-id", "p1/sub", "p")).unwrap();
        index.projects().register(Project::new("sib-id", "p1/sib", "p")).unwrap();
        index.projects().register(Project::new("alice-id", "alice", "u")).unwrap();

        for (project, id, title) in [
            ("p1", "w1", "Home"),
            ("p2", "w2", "Home"),
            ("sub-id", "w3", "Home"),
            ("sib-id", "w4", "Home"),
            ("alice-id", "w5", "Notes"),
        ] {
            index
                .insert(Artifact::wiki_page(ArtifactId::new(project, "wiki", id), title))
                .unwrap();
        }
        index
            .insert(Artifact::ticket(ArtifactId::new("p1", "tickets", "t42"), 42))
            .unwrap();
        index
    }

    fn resolved_id(resolution: &Resolution) -> Option<&str> {
        resolution.artifact().map(|a| a.id().artifact())
    }

    #[test]
    fn local_and_tool_forms() {
        let index = seeded();
        let r = Resolver::new(&index, &DefaultHost);
        let ctx = ArtifactContext::new("p", "p1", "wiki");

        assert_eq!(resolved_id(&r.resolve("[Home]", &ctx)), Some("w1"));
        assert_eq!(resolved_id(&r.resolve("[home]", &ctx)), Some("w1"));
        assert_eq!(resolved_id(&r.resolve("[tickets:#42]", &ctx)), Some("t42"));
        assert_eq!(resolved_id(&r.resolve("[tickets:t42]", &ctx)), Some("t42"));
    }

    #[test]
    fn sibling_project_form() {
        let index = seeded();
        let r = Resolver::new(&index, &DefaultHost);
        let ctx = ArtifactContext::new("p", "p1", "wiki");

        assert_eq!(resolved_id(&r.resolve("[p2:wiki:Home]", &ctx)), Some("w2"));
        assert_eq!(resolved_id(&r.resolve("[p1:sub:wiki:Home]", &ctx)), Some("w3"));
    }

    #[test]
    fn neighborhood_and_relative_forms() {
        let index = seeded();
        let r = Resolver::new(&index, &DefaultHost);
        let in_sub = ArtifactContext::new("p", "sub-id", "wiki");

        assert_eq!(resolved_id(&r.resolve("[/u:alice:wiki:Notes]", &in_sub)), Some("w5"));
        assert_eq!(resolved_id(&r.resolve("[../sib:wiki:Home]", &in_sub)), Some("w4"));
        assert_eq!(resolved_id(&r.resolve("[.:wiki:Home]", &in_sub)), Some("w1"));
        assert_eq!(
            r.resolve("[..:wiki:Home]", &in_sub),
            Resolution::Unresolved(Unresolved::NoSuchProject)
        );
    }

    #[test]
    fn relative_from_top_level_is_rooted() {
        let index = seeded();
        let r = Resolver::new(&index, &DefaultHost);
        let ctx = ArtifactContext::new("p", "p1", "wiki");

        assert_eq!(resolved_id(&r.resolve("[../p2:wiki:Home]", &ctx)), Some("w2"));
        assert_eq!(
            r.resolve("[..:..:p2:wiki:Home]", &ctx),
            Resolution::Unresolved(Unresolved::NoSuchProject)
        );
    }

    #[test]
    fn unregistered_project_hint_is_project_id() {
        let index = ArtifactIndex::new();
        index
            .insert(Artifact::wiki_page(ArtifactId::new("raw", "wiki", "w9"), "Home"))
            .unwrap();
        let r = Resolver::new(&index, &DefaultHost);
        let ctx = ArtifactContext::new("p", "elsewhere", "wiki");

        assert_eq!(resolved_id(&r.resolve("[raw:wiki:Home]", &ctx)), Some("w9"));
    }

    #[test]
    fn deleted_and_missing_are_unresolved() {
        let index = seeded();
        let gone = Artifact::wiki_page(ArtifactId::new("p1", "wiki", "w0"), "Old");
        index.insert(gone.with_deleted(true)).unwrap();
        let r = Resolver::new(&index, &DefaultHost);
        let ctx = ArtifactContext::new("p", "p1", "wiki");

        assert_eq!(r.resolve("[Old]", &ctx), Resolution::Unresolved(Unresolved::Deleted));
        assert_eq!(r.resolve("[Nope]", &ctx), Resolution::Unresolved(Unresolved::NotFound));
        assert!(matches!(
            r.resolve("[a b]", &ctx),
            Resolution::Unresolved(Unresolved::Malformed(_))
        ));
    }

    #[test]
    fn viewer_permission_filters() {
        let index = seeded();
        let r = Resolver::new(&index, &NoTickets);
        let anon = ArtifactContext::new("p", "p1", "wiki").with_viewer(Viewer::anonymous());
        let alice = ArtifactContext::new("p", "p1", "wiki").with_viewer(Viewer::new("alice"));
        let nobody = ArtifactContext::new("p", "p1", "wiki");

        assert_eq!(
            r.resolve("[tickets:#42]", &anon),
            Resolution::Unresolved(Unresolved::Forbidden)
        );
        assert!(r.resolve("[tickets:#42]", &alice).is_resolved());
        assert!(r.resolve("[tickets:#42]", &nobody).is_resolved());
    }

    #[test]
    fn identity_hit_wins_over_shorthand_of_another_artifact() {
        let index = ArtifactIndex::new();
        index
            .insert(Artifact::wiki_page(ArtifactId::new("p1", "wiki", "Intro"), "Start"))
            .unwrap();
        index
            .insert(Artifact::wiki_page(ArtifactId::new("p1", "wiki", "w2"), "Intro"))
            .unwrap();
        let r = Resolver::new(&index, &DefaultHost);
        let ctx = ArtifactContext::new("p", "p1", "wiki");

        assert_eq!(resolved_id(&r.resolve("[Intro]", &ctx)), Some("Intro"));
        assert_eq!(resolved_id(&r.resolve("[Start]", &ctx)), Some("Intro"));
    }

    #[test]
    fn identity_hit_is_still_permission_checked() {
        let index = seeded();
        let r = Resolver::new(&index, &NoTickets);
        let anon = ArtifactContext::new("p", "p1", "wiki").with_viewer(Viewer::anonymous());

        assert_eq!(
            r.resolve("[tickets:t42]", &anon),
            Resolution::Unresolved(Unresolved::Forbidden)
        );
    }
}
