//! Forge XRef Markup
//!
//! Markdown rendering for artifact text, plus the HTML helpers used around it.
//!
//! # Overview
//!
//! - [`MarkdownRenderer`]: CommonMark to HTML with shortlink resolution,
//!   bare URL auto-linking and relative link rewriting; reports the artifacts
//!   it linked to
//! - [`HtmlFilter`]: escape, strip or whitelist raw HTML
//! - [`truncate`]: cut HTML to a visible length for previews, closing open tags
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use xref_artifact::{Artifact, ArtifactContext, ArtifactId, DefaultHost, Project};
//! use xref_index::ArtifactIndex;
//! use xref_markup::MarkdownRenderer;
//!
//! let index = Arc::new(ArtifactIndex::new());
//! index.projects().register(Project::new("p2", "p2", "p")).unwrap();
//! index
//!     .insert(Artifact::wiki_page(ArtifactId::new("p2", "wiki", "w2"), "Home"))
//!     .unwrap();
//!
//! let renderer = MarkdownRenderer::new(index, Arc::new(DefaultHost));
//! let ctx = ArtifactContext::new("p", "p1", "wiki");
//! let out = renderer.render("[p2:wiki:Home]", &ctx);
//!
//! assert!(out.html.contains(r#"<a class="alink" href="/p2/wiki/Home">Home</a>"#));
//! assert_eq!(out.refs.len(), 1);
//! ```

#![warn(missing_docs)]

pub mod entities;
pub mod error;
pub mod render;
pub mod sanitize;
pub mod tokenizer;
pub mod truncate;
pub mod url;

// Re-exports
pub use error::MarkupError;
pub use render::{MarkdownRenderer, RenderOptions, Rendered, DEFAULT_MAX_SOURCE_BYTES};
pub use sanitize::{escape_html, sanitize_html, strip_tags, visible_len, HtmlFilter, HtmlMode};
pub use tokenizer::{tokenize, Attribute, HtmlToken, StartTag, Tokenizer};
pub use truncate::{check_balanced, truncate};
pub use url::{is_safe_url, UrlRewriter};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
