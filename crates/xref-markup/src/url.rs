//! Link target rewriting
//!
//! Relative `href`/`src` values are merged against the current artifact's
//! canonical URL using RFC 3986 reference resolution (path part only), so the
//! result depends on nothing but the base and the reference.

/// Schemes that are never emitted
const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Whether `url` carries a URI scheme (`http:`, `mailto:`, ...)
#[must_use]
pub fn has_scheme(url: &str) -> bool {
    let Some(colon) = url.find(':') else {
        return false;
    };
    let scheme = &url[..colon];
    scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Whether `url` is safe to place in `href`/`src`
///
/// Control characters and whitespace are ignored when looking for the scheme,
/// matching how browsers parse `java\tscript:`.
#[must_use]
pub fn is_safe_url(url: &str) -> bool {
    let decoded = crate::entities::decode_entities(url);
    let folded: String = decoded
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect();
    !BLOCKED_SCHEMES.iter().any(|s| folded.starts_with(s))
}

/// Whether `url` needs a base to be meaningful
#[must_use]
pub fn is_relative(url: &str) -> bool {
    !(url.is_empty()
        || has_scheme(url)
        || url.starts_with('/')
        || url.starts_with('#')
        || url.starts_with('?'))
}

/// Rewrites relative link targets against a fixed base
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlRewriter {
    base: Option<String>,
}

impl UrlRewriter {
    /// Rewriter that leaves every URL unchanged
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Rewriter resolving against `base`
    #[inline]
    #[must_use]
    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    /// Base URL, if any
    #[inline]
    #[must_use]
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Resolve `url` against the base
    ///
    /// Absolute URLs, root-relative paths, fragments and queries pass through.
    #[must_use]
    pub fn rewrite(&self, url: &str) -> String {
        match &self.base {
            Some(base) if is_relative(url) => merge(base, url),
            _ => url.to_string(),
        }
    }
}

/// Merge a relative reference into `base`
fn merge(base: &str, reference: &str) -> String {
    // split off `scheme://authority` so dot segments cannot climb into it
    let (origin, base_path) = split_origin(base);
    let base_path = base_path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    let (ref_path, suffix) = match reference.find(['?', '#']) {
        Some(at) => reference.split_at(at),
        None => (reference, ""),
    };

    let dir = match base_path.rfind('/') {
        Some(slash) => &base_path[..=slash],
        None => "/",
    };

    let mut segments: Vec<&str> = Vec::new();
    let joined = format!("{dir}{ref_path}");
    let mut parts = joined.split('/').peekable();
    let mut trailing_slash = false;
    while let Some(part) = parts.next() {
        let last = parts.peek().is_none();
        match part {
            "" | "." => trailing_slash = last,
            ".." => {
                segments.pop();
                trailing_slash = last;
            }
            seg => {
                segments.push(seg);
                trailing_slash = false;
            }
        }
    }

    let mut out = String::with_capacity(origin.len() + joined.len() + suffix.len());
    out.push_str(origin);
    out.push('/');
    out.push_str(&segments.join("/"));
    if trailing_slash && !segments.is_empty() {
        out.push('/');
    }
    out.push_str(suffix);
    out
}

fn split_origin(base: &str) -> (&str, &str) {
    if let Some(scheme_end) = base.find("://") {
        let after = scheme_end + 3;
        let path_start = base[after..].find('/').map_or(base.len(), |p| after + p);
        return base.split_at(path_start);
    }
    ("", base)
}
