//! Shortlink lexer
//!
//! Finds `[...]` candidates in a text stream and reports their byte spans.
//! The lexer never looks anything up; candidates are only shaped like
//! shortlinks and may still fail to parse or resolve.

use std::ops::Range;

/// Candidate shortlink found in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// Full token including brackets
    pub raw: &'a str,
    /// Text between the brackets
    pub body: &'a str,
    /// Byte span of `raw` in the scanned text
    pub span: Range<usize>,
}

/// What the lexer treats as opaque
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexMode {
    /// Raw Markdown source: skips backtick code spans and fences,
    /// `<code>`/`<pre>` regions and backslash-escaped brackets
    #[default]
    Source,

    /// Text already split out of code by a Markdown parser
    Inline,
}

/// Shortlink lexer
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexer {
    mode: LexMode,
}

impl Lexer {
    /// Lexer for raw Markdown source
    #[inline]
    #[must_use]
    pub fn source() -> Self {
        Self {
            mode: LexMode::Source,
        }
    }

    /// Lexer for parser-produced inline text
    #[inline]
    #[must_use]
    pub fn inline() -> Self {
        Self {
            mode: LexMode::Inline,
        }
    }

    /// Scan mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> LexMode {
        self.mode
    }

    /// Scan `text` and return every candidate in order
    #[must_use]
    pub fn scan<'a>(&self, text: &'a str) -> Vec<Candidate<'a>> {
        let bytes = text.as_bytes();
        let mut out = Vec::new();
        let mut open: Option<usize> = None;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' if self.mode == LexMode::Source => {
                    // escaped character never opens or closes anything
                    i += 2;
                    continue;
                }
                b'`' if self.mode == LexMode::Source => {
                    let run = run_length(bytes, i, b'`');
                    if let Some(end) = find_closing_run(bytes, i + run, run) {
                        open = None;
                        i = end;
                    } else {
                        i += run;
                    }
                    continue;
                }
                b'<' if self.mode == LexMode::Source => {
                    if let Some(end) = skip_raw_code(bytes, i) {
                        open = None;
                        i = end;
                        continue;
                    }
                }
                b'[' => open = Some(i),
                b']' => {
                    if let Some(start) = open.take() {
                        if let Some(candidate) = candidate_at(text, start, i) {
                            out.push(candidate);
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }

        out
    }
}

/// Scan raw Markdown source
#[must_use]
pub fn scan(text: &str) -> Vec<Candidate<'_>> {
    Lexer::source().scan(text)
}

/// Scan parser-produced inline text
#[must_use]
pub fn scan_inline(text: &str) -> Vec<Candidate<'_>> {
    Lexer::inline().scan(text)
}

/// Build a candidate for brackets at `open` and `close`, if it qualifies
fn candidate_at(text: &str, open: usize, close: usize) -> Option<Candidate<'_>> {
    // `[text](url)` is a Markdown link
    if text.as_bytes().get(close + 1) == Some(&b'(') {
        return None;
    }
    let body = &text[open + 1..close];
    if body.is_empty() || body.chars().any(char::is_whitespace) {
        return None;
    }
    Some(Candidate {
        raw: &text[open..=close],
        body,
        span: open..close + 1,
    })
}

fn run_length(bytes: &[u8], start: usize, b: u8) -> usize {
    bytes[start..].iter().take_while(|&&c| c == b).count()
}

/// Position just past the next run of exactly `len` backticks
fn find_closing_run(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = run_length(bytes, i, b'`');
            if run == len {
                return Some(i + run);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

/// If a `<code>` or `<pre>` element opens at `at`, position past its close
fn skip_raw_code(bytes: &[u8], at: usize) -> Option<usize> {
    for tag in [&b"code"[..], &b"pre"[..]] {
        let name_end = at + 1 + tag.len();
        if name_end > bytes.len() || !bytes[at + 1..name_end].eq_ignore_ascii_case(tag) {
            continue;
        }
        match bytes.get(name_end) {
            Some(b'>' | b'/') => {}
            Some(c) if c.is_ascii_whitespace() => {}
            _ => continue,
        }
        let mut closing = Vec::with_capacity(tag.len() + 2);
        closing.extend_from_slice(b"</");
        closing.extend_from_slice(tag);
        return Some(match find_ignore_case(bytes, name_end, &closing) {
            Some(pos) => bytes[pos..]
                .iter()
                .position(|&c| c == b'>')
                .map_or(bytes.len(), |off| pos + off + 1),
            None => bytes.len(),
        });
    }
    None
}

fn find_ignore_case(hay: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from >= hay.len() {
        return None;
    }
    hay[from..]
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|p| p + from)
}
