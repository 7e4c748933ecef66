//! Error types for markup processing
//!
//! The renderer never surfaces these to callers of [`crate::MarkdownRenderer::render`];
//! they come back from the `try_*` entry points and from [`crate::truncate`].

/// Markup processing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    /// Tags in the input do not pair up
    #[error("unbalanced markup at byte {offset}: {detail}")]
    UnbalancedMarkup {
        /// Byte offset of the offending tag (or input length for unclosed tags)
        offset: usize,
        /// What is wrong
        detail: String,
    },

    /// Source exceeds the configured render limit
    #[error("source is {size} bytes, limit is {limit}")]
    SourceTooLarge {
        /// Source length in bytes
        size: usize,
        /// Configured limit
        limit: usize,
    },

    /// Source is not valid UTF-8
    #[error("source is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The Markdown parser panicked
    #[error("markdown parser failed: {0}")]
    ParserPanic(String),
}

impl MarkupError {
    /// Create unbalanced markup error
    pub fn unbalanced(offset: usize, detail: impl Into<String>) -> Self {
        Self::UnbalancedMarkup {
            offset,
            detail: detail.into(),
        }
    }
}
