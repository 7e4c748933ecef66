//! Raw HTML handling
//!
//! Provides the escape/strip/whitelist treatments applied to raw HTML found in
//! Markdown sources, plus plain-text helpers built on the same tokenizer.

use crate::entities::entity_len_at;
use crate::tokenizer::{is_void, HtmlToken, StartTag, Tokenizer};
use crate::url::{is_safe_url, UrlRewriter};
use serde::{Deserialize, Serialize};

/// Treatment of raw HTML embedded in Markdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlMode {
    /// Keep whitelisted tags and attributes, drop the rest
    #[default]
    Sanitize,
    /// Show raw HTML as literal text
    Escape,
    /// Remove tags, keep their text
    Strip,
}

/// Tags kept by the sanitizer
const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "blockquote", "br", "caption", "center", "cite", "code", "col",
    "colgroup", "dd", "del", "details", "dfn", "div", "dl", "dt", "em", "figcaption", "figure",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "ins", "kbd", "li", "mark", "ol", "p",
    "pre", "q", "s", "samp", "small", "span", "strike", "strong", "sub", "summary", "sup",
    "table", "tbody", "td", "tfoot", "th", "thead", "tr", "tt", "u", "ul", "var",
];

/// Tags removed together with everything inside them
const DROP_CONTENT_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "applet", "noscript", "template",
    "textarea", "title", "xmp", "frameset",
];

/// Attributes allowed on any kept tag
const GLOBAL_ATTRS: &[&str] = &["title", "class", "id", "align", "lang", "dir"];

/// Attributes carrying a URL
const URL_ATTRS: &[&str] = &["href", "src", "cite"];

fn tag_attrs(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href", "name", "target", "rel"],
        "img" => &["src", "alt", "width", "height"],
        "td" | "th" => &["colspan", "rowspan", "valign", "width"],
        "table" => &["border", "cellpadding", "cellspacing", "width", "summary"],
        "ol" => &["start", "type", "reversed"],
        "li" => &["value"],
        "col" | "colgroup" => &["span", "width"],
        "q" | "blockquote" | "del" | "ins" => &["cite"],
        "details" => &["open"],
        _ => &[],
    }
}

/// Escape text for HTML element content and attribute values
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape stray angle brackets in already-encoded text, keeping entities
fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

/// Stateful raw HTML filter
///
/// Raw HTML reaches the renderer in fragments (one inline tag at a time), so
/// the filter remembers when it is inside content that must be dropped.
#[derive(Debug, Clone)]
pub struct HtmlFilter {
    mode: HtmlMode,
    rewriter: UrlRewriter,
    dropping: Option<(String, usize)>,
}

impl HtmlFilter {
    /// Create filter
    #[must_use]
    pub fn new(mode: HtmlMode, rewriter: UrlRewriter) -> Self {
        Self {
            mode,
            rewriter,
            dropping: None,
        }
    }

    /// Filter mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> HtmlMode {
        self.mode
    }

    /// Whether the filter is inside a dropped element
    ///
    /// Markdown text seen in this state must be discarded as well.
    #[inline]
    #[must_use]
    pub fn is_dropping(&self) -> bool {
        self.dropping.is_some()
    }

    /// Filter one fragment of raw HTML into `out`
    pub fn push(&mut self, fragment: &str, out: &mut String) {
        if self.mode == HtmlMode::Escape {
            out.push_str(&escape_html(fragment));
            return;
        }

        for token in Tokenizer::new(fragment) {
            if self.track_dropped(&token) {
                continue;
            }
            match token {
                HtmlToken::Text(text) => escape_text(text, out),
                HtmlToken::StartTag(tag) if self.mode == HtmlMode::Sanitize => {
                    self.write_start(&tag, out);
                }
                HtmlToken::EndTag { name, .. }
                    if self.mode == HtmlMode::Sanitize && ALLOWED_TAGS.contains(&name.as_str()) =>
                {
                    if !is_void(&name) {
                        out.push_str("</");
                        out.push_str(&name);
                        out.push('>');
                    }
                }
                _ => {}
            }
        }
    }

    /// Filter a complete fragment
    #[must_use]
    pub fn filter(&mut self, fragment: &str) -> String {
        let mut out = String::with_capacity(fragment.len());
        self.push(fragment, &mut out);
        out
    }

    /// Update drop state; `true` if the token is swallowed
    fn track_dropped(&mut self, token: &HtmlToken<'_>) -> bool {
        if let Some((name, depth)) = &mut self.dropping {
            match token {
                HtmlToken::StartTag(tag) if tag.name == *name && !tag.self_closing => *depth += 1,
                HtmlToken::EndTag { name: end, .. } if end.as_str() == name.as_str() => {
                    *depth -= 1;
                    if *depth == 0 {
                        self.dropping = None;
                    }
                }
                _ => {}
            }
            return true;
        }

        match token {
            HtmlToken::StartTag(tag) if DROP_CONTENT_TAGS.contains(&tag.name.as_str()) => {
                if !tag.self_closing && !is_void(&tag.name) {
                    self.dropping = Some((tag.name.clone(), 1));
                }
                true
            }
            HtmlToken::EndTag { name, .. } => DROP_CONTENT_TAGS.contains(&name.as_str()),
            _ => false,
        }
    }

    fn write_start(&self, tag: &StartTag<'_>, out: &mut String) {
        if !ALLOWED_TAGS.contains(&tag.name.as_str()) {
            return;
        }
        let specific = tag_attrs(&tag.name);

        out.push('<');
        out.push_str(&tag.name);
        for attr in &tag.attrs {
            let name = attr.name.as_str();
            if !GLOBAL_ATTRS.contains(&name) && !specific.contains(&name) {
                continue;
            }
            let Some(raw) = &attr.value else {
                out.push(' ');
                out.push_str(name);
                continue;
            };

            let value = crate::entities::decode_entities(raw);
            let value = if URL_ATTRS.contains(&name) {
                if !is_safe_url(&value) {
                    tracing::debug!(tag = %tag.name, attr = name, "unsafe url removed");
                    continue;
                }
                self.rewriter.rewrite(value.trim())
            } else {
                value.into_owned()
            };

            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_html(&value));
            out.push('"');
        }
        if tag.self_closing && !is_void(&tag.name) {
            out.push_str(" /");
        }
        out.push('>');
    }
}

/// Whitelist-sanitize a complete HTML fragment
#[must_use]
pub fn sanitize_html(html: &str) -> String {
    HtmlFilter::new(HtmlMode::Sanitize, UrlRewriter::none()).filter(html)
}

/// Visible text of an HTML fragment
///
/// Tags, comments and dropped elements (scripts, styles) are removed;
/// entities are kept encoded so the result is still valid HTML text.
#[must_use]
pub fn strip_tags(html: &str) -> String {
    HtmlFilter::new(HtmlMode::Strip, UrlRewriter::none()).filter(html)
}

/// Number of visible characters in an HTML fragment
///
/// Markup is not counted; every character reference counts as one.
#[must_use]
pub fn visible_len(html: &str) -> usize {
    Tokenizer::new(html)
        .map(|token| match token {
            HtmlToken::Text(text) => text_len(text),
            _ => 0,
        })
        .sum()
}

/// Visible length of encoded text
pub(crate) fn text_len(text: &str) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < text.len() {
        i += match entity_len_at(text, i) {
            Some(len) => len,
            None => text[i..].chars().next().map_or(1, char::len_utf8),
        };
        count += 1;
    }
    count
}
