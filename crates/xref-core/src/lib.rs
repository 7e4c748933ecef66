//! Forge XRef Core
//!
//! The cross-reference engine's entry point. A [`Coordinator`] owns the write
//! path for artifacts: it indexes the descriptor, renders the Markdown source,
//! records the shortlinks that resolved as forward edges in the reference
//! graph and tells the host's indexer what went stale.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use xref_artifact::{Artifact, ArtifactId, DefaultHost};
//! use xref_core::{Coordinator, RecordingNotifier};
//! use xref_graph::ReferenceGraph;
//! use xref_index::ArtifactIndex;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), xref_core::XrefError> {
//! let notifier = Arc::new(RecordingNotifier::new());
//! let coordinator = Coordinator::new(
//!     Arc::new(ArtifactIndex::new()),
//!     Arc::new(ReferenceGraph::new()),
//!     Arc::new(DefaultHost),
//!     notifier.clone(),
//! );
//!
//! let home = ArtifactId::new("p1", "wiki", "w1");
//! let notes = ArtifactId::new("p1", "wiki", "w2");
//! coordinator.on_create(Artifact::wiki_page(home.clone(), "Home"), "").await?;
//! coordinator.on_create(Artifact::wiki_page(notes.clone(), "Notes"), "see [Home]").await?;
//!
//! assert_eq!(coordinator.graph().backreferences(&home), vec![notes]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod locks;
pub mod notify;
pub mod telemetry;

// Re-exports
pub use config::{ConfigError, CoordinatorConfig, XrefConfig};
pub use coordinator::{Coordinator, DeleteReport, Snapshot, WriteOptions, WriteReport};
pub use error::XrefError;
pub use locks::{ArtifactGuard, ArtifactLocks};
pub use notify::{ChannelNotifier, IndexNotifier, NoopNotifier, RecordingNotifier};
pub use telemetry::{init_tracing, LogFormat};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for hosts embedding the engine
    pub use crate::{Coordinator, IndexNotifier, WriteOptions, XrefConfig, XrefError};
    pub use xref_artifact::{Artifact, ArtifactContext, ArtifactHost, ArtifactId, Viewer};
    pub use xref_graph::ReferenceGraph;
    pub use xref_index::ArtifactIndex;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
