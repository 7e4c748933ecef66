//! Artifact descriptors and identities
//!
//! Provides [`ArtifactId`], the immutable `(project, tool, artifact)` identity
//! triple, [`ArtifactKind`], and the [`Artifact`] descriptor that the
//! cross-reference engine passes around.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Globally unique artifact identity
///
/// The triple is immutable once created. Moving an artifact across tools or
/// projects is a delete followed by a create under a new identity.
///
/// # Examples
/// - `("p1", "wiki", "w1")` → `p1/wiki/w1`
/// - `("forge", "tickets", "t-42")` → `forge/tickets/t-42`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactId {
    project: String,
    tool: String,
    artifact: String,
}

impl ArtifactId {
    /// Create identity from its three components
    #[inline]
    #[must_use]
    pub fn new(
        project: impl Into<String>,
        tool: impl Into<String>,
        artifact: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            tool: tool.into(),
            artifact: artifact.into(),
        }
    }

    /// Create identity, rejecting empty components
    ///
    /// # Errors
    /// Returns [`IdentityError::EmptyComponent`] if any part is empty
    pub fn try_new(
        project: impl Into<String>,
        tool: impl Into<String>,
        artifact: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let id = Self::new(project, tool, artifact);
        for (name, value) in [
            ("project", &id.project),
            ("tool", &id.tool),
            ("artifact", &id.artifact),
        ] {
            if value.is_empty() {
                return Err(IdentityError::EmptyComponent(name));
            }
        }
        Ok(id)
    }

    /// Owning project id
    #[inline]
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Tool mount point within the project
    #[inline]
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Tool-local artifact id
    #[inline]
    #[must_use]
    pub fn artifact(&self) -> &str {
        &self.artifact
    }
}

impl Display for ArtifactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.tool, self.artifact)
    }
}

impl FromStr for ArtifactId {
    type Err = IdentityError;

    /// Parse `project/tool/artifact`; the artifact part may itself contain `/`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(project), Some(tool), Some(artifact)) => Self::try_new(project, tool, artifact),
            _ => Err(IdentityError::InvalidFormat(s.to_string())),
        }
    }
}

/// Closed set of artifact kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Wiki page; shorthand is the page title
    WikiPage,

    /// Tracker ticket; shorthand is usually `#<number>`
    Ticket,

    /// Forum post
    ForumPost,

    /// Blog post
    BlogPost,

    /// SCM commit
    Commit,

    /// Merge request
    MergeRequest,

    /// Anything else a tool exposes
    #[default]
    Other,
}

impl ArtifactKind {
    /// All kinds, in declaration order
    pub const ALL: [ArtifactKind; 7] = [
        Self::WikiPage,
        Self::Ticket,
        Self::ForumPost,
        Self::BlogPost,
        Self::Commit,
        Self::MergeRequest,
        Self::Other,
    ];

    /// Stable string form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WikiPage => "wiki-page",
            Self::Ticket => "ticket",
            Self::ForumPost => "forum-post",
            Self::BlogPost => "blog-post",
            Self::Commit => "commit",
            Self::MergeRequest => "merge-request",
            Self::Other => "other",
        }
    }

    /// Whether shorthands of this kind compare case-insensitively
    ///
    /// Only wiki page titles fold case.
    #[inline]
    #[must_use]
    pub const fn case_insensitive_shorthand(self) -> bool {
        matches!(self, Self::WikiPage)
    }

    /// Normalize a shorthand for comparison under this kind's rules
    #[must_use]
    pub fn normalize_shorthand(self, shorthand: &str) -> String {
        if self.case_insensitive_shorthand() {
            shorthand.to_lowercase()
        } else {
            shorthand.to_string()
        }
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| IdentityError::UnknownKind(s.to_string()))
    }
}

/// Artifact descriptor
///
/// Carries identity plus the non-identity fields the engine needs. The
/// forward and reverse reference sets are owned by the reference graph and
/// are never stored on the descriptor itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    id: ArtifactId,
    shorthand: String,
    kind: ArtifactKind,
    #[serde(default)]
    source_text: String,
    #[serde(default)]
    deleted: bool,
}

impl Artifact {
    /// Create descriptor with empty source
    #[inline]
    #[must_use]
    pub fn new(id: ArtifactId, shorthand: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            id,
            shorthand: shorthand.into(),
            kind,
            source_text: String::new(),
            deleted: false,
        }
    }

    /// Wiki page whose shorthand is its title
    #[inline]
    #[must_use]
    pub fn wiki_page(id: ArtifactId, title: impl Into<String>) -> Self {
        Self::new(id, title, ArtifactKind::WikiPage)
    }

    /// Ticket whose shorthand is `#<number>`
    #[inline]
    #[must_use]
    pub fn ticket(id: ArtifactId, number: u64) -> Self {
        Self::new(id, format!("#{number}"), ArtifactKind::Ticket)
    }

    /// With Markdown source
    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_text = source.into();
        self
    }

    /// With deleted flag
    #[inline]
    #[must_use]
    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    /// Identity triple
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    /// Human-form id local to the tool
    #[inline]
    #[must_use]
    pub fn shorthand(&self) -> &str {
        &self.shorthand
    }

    /// Artifact kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Current Markdown source
    #[inline]
    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Whether the artifact is flagged deleted
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Shorthand normalized for index comparison
    #[inline]
    #[must_use]
    pub fn shorthand_key(&self) -> String {
        self.kind.normalize_shorthand(&self.shorthand)
    }
}

/// Errors building identities and kinds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// One of the identity components is empty
    #[error("artifact identity has empty {0} component")]
    EmptyComponent(&'static str),

    /// Not in `project/tool/artifact` form
    #[error("invalid artifact identity: '{0}'")]
    InvalidFormat(String),

    /// Kind string outside the closed set
    #[error("unknown artifact kind: '{0}'")]
    UnknownKind(String),
}
