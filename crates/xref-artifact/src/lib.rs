//! Forge XRef Artifact Model
//!
//! Descriptors and identities shared by every cross-reference crate.
//!
//! # Core Concepts
//!
//! - [`ArtifactId`]: immutable `(project, tool, artifact)` identity
//! - [`Artifact`]: descriptor carrying shorthand, kind, source and deleted flag
//! - [`Project`]: project directory record (shortname paths, neighborhoods)
//! - [`ArtifactContext`]: explicit render/resolve context
//! - [`ArtifactHost`]: host callbacks for permissions, URLs and labels
//!
//! # Example
//!
//! ```rust
//! use xref_artifact::{Artifact, ArtifactHost, ArtifactId, DefaultHost};
//!
//! let page = Artifact::wiki_page(ArtifactId::new("p2", "wiki", "w2"), "Home");
//! assert_eq!(DefaultHost.canonical_url(&page), "/p2/wiki/Home");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod context;
mod host;
mod project;

pub use artifact::{Artifact, ArtifactId, ArtifactKind, IdentityError};
pub use context::{ArtifactContext, Viewer};
pub use host::{ArtifactHost, DefaultHost};
pub use project::{ancestor_path, parent_path, Project};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
