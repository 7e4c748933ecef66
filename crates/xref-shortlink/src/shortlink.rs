//! Shortlink grammar
//!
//! Parses the body of a `[...]` shortlink into its scope, project, tool and
//! shorthand parts:
//!
//! ```text
//! shortlink := "[" body "]"
//! body      := [prefix ":"] shorthand
//! prefix    := [scope ":"]* name
//! scope     := "/" neighborhood | ".." | name
//! ```

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Project hint carried by a shortlink
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectRef {
    /// `.` project token: parent of the current project
    Parent,

    /// `..` project token: grandparent of the current project
    Grandparent,

    /// Named project path
    ///
    /// `ups` counts `..` scopes (or `../` prefixes) to climb from the current
    /// project before `segments` are applied; `ups == 0` means the path is
    /// rooted at the neighborhood.
    Path {
        /// Levels to climb from the current project
        ups: usize,
        /// Shortname segments, joined with `/`
        segments: Vec<String>,
    },
}

impl ProjectRef {
    /// Shortname path of a named project (`a/b`), if this is one
    #[must_use]
    pub fn path(&self) -> Option<String> {
        match self {
            Self::Path { segments, .. } => Some(segments.join("/")),
            _ => None,
        }
    }
}

/// Parsed shortlink
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortlink {
    neighborhood: Option<String>,
    project: Option<ProjectRef>,
    tool: Option<String>,
    shorthand: String,
}

impl Shortlink {
    /// Local shortlink (`[id]`)
    #[inline]
    #[must_use]
    pub fn local(shorthand: impl Into<String>) -> Self {
        Self {
            neighborhood: None,
            project: None,
            tool: None,
            shorthand: shorthand.into(),
        }
    }

    /// Parse a shortlink, with or without its surrounding brackets
    ///
    /// # Errors
    /// Returns [`ShortlinkError`] if the text does not follow the grammar
    pub fn parse(text: &str) -> Result<Self, ShortlinkError> {
        let body = text
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(text);
        Self::parse_body(body)
    }

    fn parse_body(body: &str) -> Result<Self, ShortlinkError> {
        if body.is_empty() {
            return Err(ShortlinkError::Empty);
        }
        if body.chars().any(char::is_whitespace) {
            return Err(ShortlinkError::Whitespace);
        }
        if let Some(c) = body.chars().find(|c| matches!(c, '[' | ']')) {
            return Err(ShortlinkError::InvalidChar(c));
        }

        let parts: Vec<&str> = body.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ShortlinkError::EmptySegment(body.to_string()));
        }

        let n = parts.len();
        let shorthand = parts[n - 1].to_string();
        let mut link = Self::local(shorthand);

        if n >= 2 {
            let tool = parts[n - 2];
            if tool == "." || tool == ".." || tool.starts_with('/') {
                return Err(ShortlinkError::InvalidTool(tool.to_string()));
            }
            link.tool = Some(tool.to_string());
        }

        if n >= 3 {
            let (neighborhood, project) = Self::parse_prefix(&parts[..n - 3], parts[n - 3])?;
            link.neighborhood = neighborhood;
            link.project = Some(project);
        }

        Ok(link)
    }

    /// Parse the scopes and project token of a qualified shortlink
    fn parse_prefix(
        scopes: &[&str],
        project_token: &str,
    ) -> Result<(Option<String>, ProjectRef), ShortlinkError> {
        let mut neighborhood = None;
        let mut ups = 0usize;
        let mut segments: Vec<String> = Vec::new();

        for (i, scope) in scopes.iter().enumerate() {
            if let Some(nbhd) = scope.strip_prefix('/') {
                if i != 0 || nbhd.is_empty() || nbhd.contains('/') {
                    return Err(ShortlinkError::InvalidScope((*scope).to_string()));
                }
                neighborhood = Some(nbhd.to_string());
            } else if *scope == ".." {
                if !segments.is_empty() || neighborhood.is_some() {
                    return Err(ShortlinkError::InvalidScope((*scope).to_string()));
                }
                ups += 1;
            } else if *scope == "." || scope.contains('/') {
                return Err(ShortlinkError::InvalidScope((*scope).to_string()));
            } else {
                segments.push((*scope).to_string());
            }
        }

        if scopes.is_empty() {
            match project_token {
                "." => return Ok((None, ProjectRef::Parent)),
                ".." => return Ok((None, ProjectRef::Grandparent)),
                _ => {}
            }
        }

        let mut token = project_token;
        while let Some(rest) = token.strip_prefix("../") {
            if !segments.is_empty() || neighborhood.is_some() {
                return Err(ShortlinkError::InvalidScope(project_token.to_string()));
            }
            ups += 1;
            token = rest;
        }

        if token.is_empty() || token == "." || token == ".." || token.starts_with('/') {
            return Err(ShortlinkError::InvalidProject(project_token.to_string()));
        }
        segments.extend(token.split('/').map(str::to_string));
        if segments.iter().any(|s| s.is_empty() || s == "." || s == "..") {
            return Err(ShortlinkError::InvalidProject(project_token.to_string()));
        }

        Ok((neighborhood, ProjectRef::Path { ups, segments }))
    }

    /// Explicit neighborhood (`/nbhd` scope)
    #[inline]
    #[must_use]
    pub fn neighborhood(&self) -> Option<&str> {
        self.neighborhood.as_deref()
    }

    /// Project hint
    #[inline]
    #[must_use]
    pub fn project(&self) -> Option<&ProjectRef> {
        self.project.as_ref()
    }

    /// Tool hint
    #[inline]
    #[must_use]
    pub fn tool(&self) -> Option<&str> {
        self.tool.as_deref()
    }

    /// Tool-local shorthand
    #[inline]
    #[must_use]
    pub fn shorthand(&self) -> &str {
        &self.shorthand
    }

    /// Whether the link names nothing beyond the shorthand
    #[inline]
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.tool.is_none()
    }
}

impl Display for Shortlink {
    /// Canonical wire form, brackets included
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        if let Some(nbhd) = &self.neighborhood {
            write!(f, "/{nbhd}:")?;
        }
        match &self.project {
            Some(ProjectRef::Parent) => f.write_str(".:")?,
            Some(ProjectRef::Grandparent) => f.write_str("..:")?,
            Some(ProjectRef::Path { ups, segments }) => {
                for _ in 0..*ups {
                    f.write_str("..:")?;
                }
                write!(f, "{}:", segments.join(":"))?;
            }
            None => {}
        }
        if let Some(tool) = &self.tool {
            write!(f, "{tool}:")?;
        }
        write!(f, "{}]", self.shorthand)
    }
}

impl FromStr for Shortlink {
    type Err = ShortlinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Grammar violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortlinkError {
    /// `[]`
    #[error("shortlink body is empty")]
    Empty,

    /// Whitespace inside the brackets
    #[error("shortlink contains whitespace")]
    Whitespace,

    /// Nested bracket inside the body
    #[error("shortlink contains invalid character '{0}'")]
    InvalidChar(char),

    /// `a::b` and similar
    #[error("shortlink has an empty segment: '{0}'")]
    EmptySegment(String),

    /// Malformed scope (`/nbhd` not first, `..` after a name, ...)
    #[error("invalid shortlink scope: '{0}'")]
    InvalidScope(String),

    /// Malformed project token
    #[error("invalid shortlink project: '{0}'")]
    InvalidProject(String),

    /// Malformed tool token
    #[error("invalid shortlink tool: '{0}'")]
    InvalidTool(String),
}
