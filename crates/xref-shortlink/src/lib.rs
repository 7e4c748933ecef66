//! Forge XRef Shortlinks
//!
//! Recognizes `[...]` artifact references in text and parses them.
//!
//! # Overview
//!
//! - **Lexer**: finds candidate `[...]` tokens and their byte spans, skipping
//!   code spans, fences and `<code>`/`<pre>` regions
//! - **Shortlink**: parses a candidate into neighborhood, project, tool and
//!   shorthand hints
//!
//! # Example
//!
//! ```rust
//! use xref_shortlink::{scan, Shortlink};
//!
//! let text = "Fixed by [tickets:#42], see `[not this]`.";
//! let found = scan(text);
//! assert_eq!(found.len(), 1);
//!
//! let link = Shortlink::parse(found[0].raw).unwrap();
//! assert_eq!(link.tool(), Some("tickets"));
//! assert_eq!(link.shorthand(), "#42");
//! ```

#![warn(missing_docs)]

pub mod lexer;
pub mod shortlink;

// Re-exports
pub use lexer::{scan, scan_inline, Candidate, LexMode, Lexer};
pub use shortlink::{ProjectRef, Shortlink, ShortlinkError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
