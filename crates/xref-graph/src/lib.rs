//! Forge XRef Reference Graph
//!
//! Forward `references` and reverse `backreferences` between artifacts,
//! kept mutually consistent by construction.
//!
//! # Example
//!
//! ```rust
//! use xref_artifact::ArtifactId;
//! use xref_graph::ReferenceGraph;
//!
//! let a = ArtifactId::new("p1", "wiki", "a");
//! let b = ArtifactId::new("p2", "wiki", "b");
//!
//! let graph = ReferenceGraph::new();
//! graph.add_node(a.clone());
//! graph.add_node(b.clone());
//! graph.set_forward(&a, [b.clone()]).unwrap();
//!
//! assert_eq!(graph.backreferences(&b), vec![a]);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod graph;

// Re-exports
pub use error::GraphError;
pub use graph::{EdgeDiff, ReferenceGraph};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
