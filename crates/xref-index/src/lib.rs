//! Forge XRef Index
//!
//! Canonical artifact registry and shortlink resolution.
//!
//! # Overview
//!
//! - **ArtifactIndex**: identity and shorthand lookup over concurrent maps
//! - **ProjectDirectory**: shortname paths to project ids, per neighborhood
//! - **Resolver**: shortlink text plus context to a live, readable artifact
//!
//! # Example
//!
//! ```rust
//! use xref_artifact::{Artifact, ArtifactContext, ArtifactId, DefaultHost};
//! use xref_index::{ArtifactIndex, Resolver};
//!
//! let index = ArtifactIndex::new();
//! index
//!     .insert(Artifact::wiki_page(ArtifactId::new("p2", "wiki", "w2"), "Home"))
//!     .unwrap();
//!
//! let ctx = ArtifactContext::new("p", "p1", "wiki");
//! let found = Resolver::new(&index, &DefaultHost).resolve("[p2:wiki:Home]", &ctx);
//! assert_eq!(found.artifact().map(|a| a.id().artifact()), Some("w2"));
//! ```

#![warn(missing_docs)]

pub mod directory;
pub mod error;
pub mod index;
pub mod resolver;

// Re-exports
pub use directory::ProjectDirectory;
pub use error::IndexError;
pub use index::ArtifactIndex;
pub use resolver::{Resolution, Resolver, Unresolved};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
