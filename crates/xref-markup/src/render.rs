//! Forge Markdown renderer
//!
//! Renders CommonMark (tables, strikethrough, task lists, footnotes) to HTML
//! through the pulldown-cmark event stream and rewrites the stream on the way
//! through:
//!
//! - text runs are scanned for shortlinks, which become `<a class="alink">`
//!   anchors when they resolve and stay literal otherwise
//! - bare URLs are auto-linked
//! - relative link and image targets are merged against the current
//!   artifact's canonical URL
//! - raw HTML is escaped, stripped or whitelisted per [`HtmlMode`]
//!
//! Rendering never fails: any failure yields the `markdown-error` block.

use crate::error::MarkupError;
use crate::sanitize::{escape_html, HtmlFilter, HtmlMode};
use crate::tokenizer::{HtmlToken, Tokenizer};
use crate::url::{is_safe_url, UrlRewriter};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use xref_artifact::{Artifact, ArtifactContext, ArtifactHost, ArtifactId};
use xref_index::{ArtifactIndex, Resolution, Resolver};
use xref_shortlink::scan_inline;

static BARE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:(?:https?|ftp)://|www\.)[^\s<>\[\]]+").expect("valid bare url regex")
});

/// Default render size limit (1 MiB)
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 1 << 20;

/// Renderer options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Raw HTML treatment for [`MarkdownRenderer::render`]
    pub html_mode: HtmlMode,
    /// Link bare URLs
    pub autolink: bool,
    /// Larger sources render as the error block
    pub max_source_bytes: usize,
    /// CSS class of shortlink anchors
    pub link_class: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            html_mode: HtmlMode::Sanitize,
            autolink: true,
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            link_class: "alink".to_string(),
        }
    }
}

/// Render output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// HTML fragment
    pub html: String,
    /// Resolved shortlink targets in first-occurrence order, without the
    /// artifact being rendered
    pub refs: Vec<Artifact>,
}

impl Rendered {
    /// Error block for a source that could not be rendered
    #[must_use]
    pub fn failed(source: &str) -> Self {
        Self {
            html: format!(
                "<div class=\"markdown-error\"><pre>{}</pre></div>",
                escape_html(source)
            ),
            refs: Vec::new(),
        }
    }

    /// Identities of the discovered references
    #[must_use]
    pub fn ref_ids(&self) -> Vec<ArtifactId> {
        self.refs.iter().map(|a| a.id().clone()).collect()
    }
}

/// Markdown renderer bound to an index and host callbacks
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    index: Arc<ArtifactIndex>,
    host: Arc<dyn ArtifactHost>,
    options: RenderOptions,
}

impl MarkdownRenderer {
    /// Create renderer with default options
    #[must_use]
    pub fn new(index: Arc<ArtifactIndex>, host: Arc<dyn ArtifactHost>) -> Self {
        Self::with_options(index, host, RenderOptions::default())
    }

    /// Create renderer with options
    #[must_use]
    pub fn with_options(
        index: Arc<ArtifactIndex>,
        host: Arc<dyn ArtifactHost>,
        options: RenderOptions,
    ) -> Self {
        Self {
            index,
            host,
            options,
        }
    }

    /// Renderer options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render Markdown and collect resolved references
    #[must_use]
    pub fn render(&self, source: &str, ctx: &ArtifactContext) -> Rendered {
        self.render_or_fallback(source, ctx, self.options.html_mode)
    }

    /// Render with raw HTML escaped regardless of configuration
    #[must_use]
    pub fn render_safe(&self, source: &str, ctx: &ArtifactContext) -> Rendered {
        self.render_or_fallback(source, ctx, HtmlMode::Escape)
    }

    /// Render arbitrary bytes
    ///
    /// Invalid UTF-8 yields the error block over the lossy decoding.
    #[must_use]
    pub fn render_bytes(&self, bytes: &[u8], ctx: &ArtifactContext) -> Rendered {
        match std::str::from_utf8(bytes).map_err(MarkupError::from) {
            Ok(source) => self.render(source, ctx),
            Err(err) => {
                tracing::warn!(error = %err, len = bytes.len(), "markdown source is not UTF-8");
                Rendered::failed(&String::from_utf8_lossy(bytes))
            }
        }
    }

    /// Render, reporting why rendering failed instead of falling back
    ///
    /// # Errors
    /// - [`MarkupError::SourceTooLarge`] above `max_source_bytes`
    /// - [`MarkupError::ParserPanic`] if the parser panicked
    pub fn try_render(
        &self,
        source: &str,
        ctx: &ArtifactContext,
        mode: HtmlMode,
    ) -> Result<Rendered, MarkupError> {
        if source.len() > self.options.max_source_bytes {
            return Err(MarkupError::SourceTooLarge {
                size: source.len(),
                limit: self.options.max_source_bytes,
            });
        }

        panic::catch_unwind(AssertUnwindSafe(|| self.render_events(source, ctx, mode))).map_err(
            |payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                MarkupError::ParserPanic(message)
            },
        )
    }

    fn render_or_fallback(&self, source: &str, ctx: &ArtifactContext, mode: HtmlMode) -> Rendered {
        self.try_render(source, ctx, mode).unwrap_or_else(|err| {
            tracing::warn!(
                error = %err,
                artifact = ?ctx.current,
                "markdown render failed, emitting error block"
            );
            Rendered::failed(source)
        })
    }

    /// Base for relative links: explicit base URL, else the current
    /// artifact's canonical URL
    fn rewriter(&self, ctx: &ArtifactContext) -> UrlRewriter {
        if let Some(base) = &ctx.base_url {
            return UrlRewriter::with_base(base.clone());
        }
        ctx.current
            .as_ref()
            .and_then(|id| self.index.get(id))
            .map_or_else(UrlRewriter::none, |current| {
                UrlRewriter::with_base(self.host.canonical_url(&current))
            })
    }

    fn render_events(&self, source: &str, ctx: &ArtifactContext, mode: HtmlMode) -> Rendered {
        let rewriter = self.rewriter(ctx);
        let mut pass = RenderPass {
            renderer: self,
            resolver: Resolver::new(&self.index, self.host.as_ref()),
            ctx,
            filter: HtmlFilter::new(mode, rewriter.clone()),
            rewriter,
            source,
            events: Vec::new(),
            pending: String::new(),
            protected: Vec::new(),
            cache: HashMap::new(),
            refs: IndexMap::new(),
            link_depth: 0,
            in_code_block: false,
            raw_code_depth: 0,
            html_block: None,
        };

        let parser = Parser::new_ext(source, markdown_options()).into_offset_iter();
        for (event, range) in parser {
            pass.handle(event, range);
        }
        pass.flush_text();

        let mut html = String::with_capacity(source.len() + source.len() / 2);
        html::push_html(&mut html, pass.events.into_iter());
        Rendered {
            html,
            refs: pass.refs.into_values().collect(),
        }
    }
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// State of one render call
struct RenderPass<'r, 'a> {
    renderer: &'r MarkdownRenderer,
    resolver: Resolver<'r>,
    ctx: &'r ArtifactContext,
    filter: HtmlFilter,
    rewriter: UrlRewriter,
    source: &'a str,
    events: Vec<Event<'a>>,

    /// Coalesced text awaiting shortlink scanning
    pending: String,
    /// Spans of `pending` that came from escapes or entities
    protected: Vec<Range<usize>>,

    /// Per-call resolution cache keyed by raw shortlink
    cache: HashMap<String, Option<Artifact>>,
    refs: IndexMap<ArtifactId, Artifact>,

    link_depth: usize,
    in_code_block: bool,
    raw_code_depth: usize,
    html_block: Option<String>,
}

impl<'a> RenderPass<'_, 'a> {
    fn scanning_text(&self) -> bool {
        self.link_depth == 0 && !self.in_code_block && self.raw_code_depth == 0
    }

    fn handle(&mut self, event: Event<'a>, range: Range<usize>) {
        match event {
            Event::Text(_) if self.filter.is_dropping() => {}
            Event::Text(text) if self.scanning_text() => {
                let start = self.pending.len();
                self.pending.push_str(&text);
                if self.source.get(range) != Some(text.as_ref()) {
                    self.protected.push(start..self.pending.len());
                }
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                self.flush_text();
                self.link_depth += 1;
                let dest_url = self.link_target(link_type, dest_url);
                self.events.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                self.flush_text();
                self.link_depth += 1;
                let dest_url = self.link_target(link_type, dest_url);
                self.events.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }
            Event::End(end @ (TagEnd::Link | TagEnd::Image)) => {
                self.flush_text();
                self.link_depth = self.link_depth.saturating_sub(1);
                self.events.push(Event::End(end));
            }
            Event::Start(tag @ Tag::CodeBlock(_)) => {
                self.flush_text();
                self.in_code_block = true;
                self.events.push(Event::Start(tag));
            }
            Event::End(TagEnd::CodeBlock) => {
                self.flush_text();
                self.in_code_block = false;
                self.events.push(Event::End(TagEnd::CodeBlock));
            }
            Event::Start(Tag::HtmlBlock) => {
                self.flush_text();
                self.html_block = Some(String::new());
                self.events.push(Event::Start(Tag::HtmlBlock));
            }
            Event::Html(chunk) => match &mut self.html_block {
                Some(block) => block.push_str(&chunk),
                None => self.push_raw_html(&chunk),
            },
            Event::End(TagEnd::HtmlBlock) => {
                if let Some(block) = self.html_block.take() {
                    self.push_raw_html(&block);
                }
                self.events.push(Event::End(TagEnd::HtmlBlock));
            }
            Event::InlineHtml(chunk) => {
                self.flush_text();
                self.push_raw_html(&chunk);
            }
            other => {
                self.flush_text();
                self.events.push(other);
            }
        }
    }

    fn link_target(&self, link_type: LinkType, dest: CowStr<'a>) -> CowStr<'a> {
        if link_type == LinkType::Email {
            return dest;
        }
        if !is_safe_url(&dest) {
            tracing::debug!(url = %dest, "unsafe link target replaced");
            return CowStr::Borrowed("#");
        }
        let rewritten = self.rewriter.rewrite(&dest);
        if rewritten == *dest {
            dest
        } else {
            CowStr::from(rewritten)
        }
    }

    fn push_raw_html(&mut self, fragment: &str) {
        for token in Tokenizer::new(fragment) {
            match token {
                HtmlToken::StartTag(tag)
                    if matches!(tag.name.as_str(), "code" | "pre") && !tag.self_closing =>
                {
                    self.raw_code_depth += 1;
                }
                HtmlToken::EndTag { name, .. } if matches!(name.as_str(), "code" | "pre") => {
                    self.raw_code_depth = self.raw_code_depth.saturating_sub(1);
                }
                _ => {}
            }
        }

        let filtered = self.filter.filter(fragment);
        if !filtered.is_empty() {
            self.events.push(Event::InlineHtml(CowStr::from(filtered)));
        }
    }

    /// Scan the coalesced text run and emit it
    fn flush_text(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending);
        let protected = std::mem::take(&mut self.protected);

        let mut cursor = 0;
        for candidate in scan_inline(&text) {
            let span = candidate.span.clone();
            if protected
                .iter()
                .any(|p| p.start < span.end && span.start < p.end)
            {
                continue;
            }
            let Some(target) = self.resolve(candidate.raw) else {
                continue;
            };

            self.push_literal(&text[cursor..span.start]);
            let anchor = self.anchor(&target);
            self.events.push(Event::InlineHtml(CowStr::from(anchor)));
            if !self.ctx.is_current(target.id()) {
                self.refs.entry(target.id().clone()).or_insert(target);
            }
            cursor = span.end;
        }
        self.push_literal(&text[cursor..]);
    }

    fn resolve(&mut self, raw: &str) -> Option<Artifact> {
        if let Some(hit) = self.cache.get(raw) {
            return hit.clone();
        }
        let resolved = match self.resolver.resolve(raw, self.ctx) {
            Resolution::Resolved(artifact) => Some(artifact),
            Resolution::Unresolved(reason) => {
                tracing::trace!(shortlink = raw, reason = ?reason, "shortlink left literal");
                None
            }
            Resolution::Ambiguous(_) => None,
        };
        self.cache.insert(raw.to_string(), resolved.clone());
        resolved
    }

    fn anchor(&self, target: &Artifact) -> String {
        let host = &self.renderer.host;
        format!(
            "<a class=\"{}\" href=\"{}\">{}</a>",
            escape_html(&self.renderer.options.link_class),
            escape_html(&host.canonical_url(target)),
            escape_html(&host.short_label(target)),
        )
    }

    /// Emit plain text, auto-linking bare URLs when enabled
    fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.renderer.options.autolink {
            self.events.push(Event::Text(CowStr::from(text.to_string())));
            return;
        }

        let mut cursor = 0;
        for found in BARE_URL.find_iter(text) {
            let url = trim_url(found.as_str());
            if url.is_empty() {
                continue;
            }
            let start = found.start();
            if start > cursor {
                self.events
                    .push(Event::Text(CowStr::from(text[cursor..start].to_string())));
            }
            let href = if url.len() >= 4 && url[..4].eq_ignore_ascii_case("www.") {
                format!("http://{url}")
            } else {
                url.to_string()
            };
            self.events.push(Event::InlineHtml(CowStr::from(format!(
                "<a href=\"{}\">{}</a>",
                escape_html(&href),
                escape_html(url)
            ))));
            cursor = start + url.len();
        }
        if cursor < text.len() {
            self.events
                .push(Event::Text(CowStr::from(text[cursor..].to_string())));
        }
    }
}

/// Drop trailing punctuation that ends the sentence rather than the URL
fn trim_url(url: &str) -> &str {
    let mut end = url.len();
    loop {
        let trimmed = &url[..end];
        let Some(last) = trimmed.chars().last() else {
            break;
        };
        let drop = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' => true,
            ')' => trimmed.matches('(').count() < trimmed.matches(')').count(),
            _ => false,
        };
        if !drop {
            break;
        }
        end -= last.len_utf8();
    }
    &url[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xref_artifact::{DefaultHost, Project, Viewer};

    fn setup() -> (Arc<ArtifactIndex>, MarkdownRenderer) {
        let index = Arc::new(ArtifactIndex::new());
        index.projects().register(Project::new("p1", "p1", "p")).unwrap();
        index.projects().register(Project::new("p2", "p2", "p")).unwrap();
        index
            .insert(Artifact::wiki_page(ArtifactId::new("p1", "wiki", "w1"), "Start"))
            .unwrap();
        index
            .insert(Artifact::wiki_page(ArtifactId::new("p2", "wiki", "w2"), "Home"))
            .unwrap();
        index
            .insert(Artifact::ticket(ArtifactId::new("p1", "tickets", "t42"), 42))
            .unwrap();
        let renderer = MarkdownRenderer::new(Arc::clone(&index), Arc::new(DefaultHost));
        (index, renderer)
    }

    fn ctx() -> ArtifactContext {
        ArtifactContext::for_artifact("p", &ArtifactId::new("p1", "wiki", "w1"))
    }

    #[test]
    fn resolves_cross_project_shortlink() {
        let (_, r) = setup();
        let out = r.render("[p2:wiki:Home]", &ctx());
        assert_eq!(
            out.html,
            "<p><a class=\"alink\" href=\"/p2/wiki/Home\">Home</a></p>\n"
        );
        assert_eq!(out.ref_ids(), vec![ArtifactId::new("p2", "wiki", "w2")]);
    }

    #[test]
    fn unresolved_and_whitespace_stay_literal() {
        let (_, r) = setup();
        let out = r.render("[Nope] and [not a link]", &ctx());
        assert_eq!(out.html, "<p>[Nope] and [not a link]</p>\n");
        assert!(out.refs.is_empty());
    }

    #[test]
    fn refs_are_ordered_and_deduplicated() {
        let (_, r) = setup();
        let out = r.render("[tickets:#42] [p2:wiki:Home] [tickets:#42]", &ctx());
        assert_eq!(
            out.ref_ids(),
            vec![
                ArtifactId::new("p1", "tickets", "t42"),
                ArtifactId::new("p2", "wiki", "w2"),
            ]
        );
    }

    #[test]
    fn self_link_renders_without_ref() {
        let (_, r) = setup();
        let out = r.render("see [Start]", &ctx());
        assert!(out.html.contains("href=\"/p1/wiki/Start\""));
        assert!(out.refs.is_empty());
    }

    #[test]
    fn code_and_links_are_not_scanned() {
        let (_, r) = setup();
        let out = r.render(
            concat!(
                "`[p2:wiki:Home]`\n\n```\n[p2:wiki:Home]\n```\n\n",
                "[label](http://x.org) <code>[p2:wiki:Home]</code>",
            ),
            &ctx(),
        );
        assert!(!out.html.contains("alink"));
        assert!(out.refs.is_empty());
    }

    #[test]
    fn escaped_brackets_stay_literal() {
        let (_, r) = setup();
        let out = r.render(r"\[p2:wiki:Home]", &ctx());
        assert!(!out.html.contains("alink"));
    }

    #[test]
    fn shortlink_inside_emphasis() {
        let (_, r) = setup();
        let out = r.render("*see [p2:wiki:Home]*", &ctx());
        assert!(out
            .html
            .contains("<em>see <a class=\"alink\" href=\"/p2/wiki/Home\">Home</a></em>"));
    }

    #[test]
    fn autolinks_bare_urls() {
        let (_, r) = setup();
        let out = r.render("visit https://example.com/a?b=1. or www.example.org", &ctx());
        assert!(out
            .html
            .contains("<a href=\"https://example.com/a?b=1\">https://example.com/a?b=1</a>."));
        assert!(out
            .html
            .contains("<a href=\"http://www.example.org\">www.example.org</a>"));
    }

    #[test]
    fn relative_links_use_current_artifact_url() {
        let (_, r) = setup();
        let out = r.render("[o](Other) ![i](pic.png) [a](/abs)", &ctx());
        assert!(out.html.contains("href=\"/p1/wiki/Other\""));
        assert!(out.html.contains("src=\"/p1/wiki/pic.png\""));
        assert!(out.html.contains("href=\"/abs\""));

        let explicit = ctx().with_base_url("/p1/wiki/Start/");
        let out = r.render("[o](Other)", &explicit);
        assert!(out.html.contains("href=\"/p1/wiki/Start/Other\""));
    }

    #[test]
    fn script_links_are_neutralized() {
        let (_, r) = setup();
        let out = r.render("[x](javascript:alert(1))", &ctx());
        assert!(!out.html.contains("javascript"));
    }

    #[test]
    fn raw_html_modes() {
        let (_, r) = setup();
        let src = "<b onclick=\"x()\">bold</b><script>alert(1)</script>";

        let sanitized = r.render(src, &ctx()).html;
        assert!(sanitized.contains("<b>bold</b>"));
        assert!(!sanitized.contains("alert"));
        assert!(!sanitized.contains("onclick"));

        let escaped = r.render_safe(src, &ctx()).html;
        assert!(escaped.contains("&lt;b onclick="));

        let strip = MarkdownRenderer::with_options(
            Arc::new(ArtifactIndex::new()),
            Arc::new(DefaultHost),
            RenderOptions {
                html_mode: HtmlMode::Strip,
                ..RenderOptions::default()
            },
        );
        let stripped = strip.render(src, &ctx()).html;
        assert!(stripped.contains("bold"));
        assert!(!stripped.contains("<b"));
        assert!(!stripped.contains("alert"));
    }

    #[test]
    fn forbidden_target_stays_literal() {
        #[derive(Debug)]
        struct Private;
        impl ArtifactHost for Private {
            fn can_read(&self, _viewer: &Viewer, _artifact: &Artifact) -> bool {
                false
            }
            fn canonical_url(&self, artifact: &Artifact) -> String {
                DefaultHost.canonical_url(artifact)
            }
            fn short_label(&self, artifact: &Artifact) -> String {
                DefaultHost.short_label(artifact)
            }
        }

        let (index, _) = setup();
        let r = MarkdownRenderer::new(index, Arc::new(Private));
        let out = r.render("[p2:wiki:Home]", &ctx().with_viewer(Viewer::new("bob")));
        assert!(out.refs.is_empty());
        assert!(out.html.contains("[p2:wiki:Home]"));
    }

    #[test]
    fn oversized_source_renders_error_block() {
        let r = MarkdownRenderer::with_options(
            Arc::new(ArtifactIndex::new()),
            Arc::new(DefaultHost),
            RenderOptions {
                max_source_bytes: 8,
                ..RenderOptions::default()
            },
        );
        let out = r.render("<b>too long</b>", &ctx());
        assert_eq!(
            out.html,
            "<div class=\"markdown-error\"><pre>&lt;b&gt;too long&lt;/b&gt;</pre></div>"
        );
        assert!(out.refs.is_empty());
    }

    #[test]
    fn invalid_utf8_renders_error_block() {
        let (_, r) = setup();
        let out = r.render_bytes(b"[p2:wiki:Home] \xff\xfe", &ctx());
        assert!(out.html.starts_with("<div class=\"markdown-error\"><pre>"));
        assert!(out.refs.is_empty());
    }

    #[test]
    fn trims_sentence_punctuation() {
        assert_eq!(trim_url("http://x.org/a."), "http://x.org/a");
        assert_eq!(trim_url("http://x.org/(a)"), "http://x.org/(a)");
        assert_eq!(trim_url("http://x.org/a)"), "http://x.org/a");
    }
}
