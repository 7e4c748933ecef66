//! Lenient HTML tokenizer
//!
//! Splits HTML into tags, text, comments and declarations. It never fails:
//! anything that does not form a complete tag is returned as text, so the
//! concatenation of every token's source equals the input.

/// One attribute of a start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased attribute name
    pub name: String,
    /// Raw value with entities still encoded; `None` for bare attributes
    pub value: Option<String>,
}

/// Start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag<'a> {
    /// Lowercased tag name
    pub name: String,
    /// Attributes in source order
    pub attrs: Vec<Attribute>,
    /// Written as `<name ... />`
    pub self_closing: bool,
    /// Source text of the tag
    pub raw: &'a str,
}

impl StartTag<'_> {
    /// Raw value of the named attribute
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }
}

/// HTML token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlToken<'a> {
    /// Character data, entities still encoded
    Text(&'a str),
    /// `<name ...>`
    StartTag(StartTag<'a>),
    /// `</name>`
    EndTag {
        /// Lowercased tag name
        name: String,
        /// Source text of the tag
        raw: &'a str,
    },
    /// `<!-- ... -->`
    Comment(&'a str),
    /// `<!...>` or `<?...>`
    Declaration(&'a str),
}

impl<'a> HtmlToken<'a> {
    /// Source text of the token
    #[must_use]
    pub fn raw(&self) -> &'a str {
        match self {
            Self::Text(raw) | Self::Comment(raw) | Self::Declaration(raw) => *raw,
            Self::StartTag(tag) => tag.raw,
            Self::EndTag { raw, .. } => *raw,
        }
    }
}

/// Elements that never have content or a close tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content is raw text up to the matching close tag
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title", "xmp"];

/// Check if tag name is a void element
#[inline]
#[must_use]
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Streaming tokenizer over an HTML string
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    raw_text: Option<String>,
}

impl<'a> Tokenizer<'a> {
    /// Create tokenizer
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            raw_text: None,
        }
    }

    /// Current byte offset
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn next_raw_text(&mut self, name: &str) -> Option<HtmlToken<'a>> {
        let rest = &self.src[self.pos..];
        let closing = format!("</{name}");
        let end = find_ignore_case(rest, &closing).unwrap_or(rest.len());
        self.pos += end;
        (end > 0).then(|| HtmlToken::Text(&rest[..end]))
    }

    fn next_text(&mut self) -> HtmlToken<'a> {
        let start = self.pos;
        // a '<' that failed to open a tag belongs to this text run
        let skip = usize::from(self.src.as_bytes()[start] == b'<');
        let end = self.src[start + skip..]
            .find('<')
            .map_or(self.src.len(), |off| start + skip + off);
        self.pos = end;
        HtmlToken::Text(&self.src[start..end])
    }

    fn try_markup(&self) -> Option<(HtmlToken<'a>, usize)> {
        let rest = &self.src[self.pos..];
        let bytes = rest.as_bytes();
        if bytes.first() != Some(&b'<') {
            return None;
        }

        if rest.starts_with("<!--") {
            let len = rest[4..].find("-->").map_or(rest.len(), |off| off + 7);
            return Some((HtmlToken::Comment(&rest[..len]), len));
        }
        if matches!(bytes.get(1), Some(b'!' | b'?')) {
            let len = rest.find('>')? + 1;
            return Some((HtmlToken::Declaration(&rest[..len]), len));
        }
        if bytes.get(1) == Some(&b'/') {
            if !bytes.get(2).is_some_and(u8::is_ascii_alphabetic) {
                return None;
            }
            let name_len = name_length(&rest[2..]);
            let len = rest.find('>')? + 1;
            let name = rest[2..2 + name_len].to_ascii_lowercase();
            return Some((
                HtmlToken::EndTag {
                    name,
                    raw: &rest[..len],
                },
                len,
            ));
        }
        if !bytes.get(1).is_some_and(u8::is_ascii_alphabetic) {
            return None;
        }

        let name_len = name_length(&rest[1..]);
        let name = rest[1..1 + name_len].to_ascii_lowercase();
        let (attrs, self_closing, len) = parse_attributes(rest, 1 + name_len)?;
        Some((
            HtmlToken::StartTag(StartTag {
                name,
                attrs,
                self_closing,
                raw: &rest[..len],
            }),
            len,
        ))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = HtmlToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.src.len() {
            return None;
        }

        if let Some(name) = self.raw_text.take() {
            if let Some(text) = self.next_raw_text(&name) {
                return Some(text);
            }
            if self.pos >= self.src.len() {
                return None;
            }
        }

        if let Some((token, len)) = self.try_markup() {
            self.pos += len;
            if let HtmlToken::StartTag(tag) = &token {
                if !tag.self_closing && RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
                    self.raw_text = Some(tag.name.clone());
                }
            }
            return Some(token);
        }

        Some(self.next_text())
    }
}

/// Tokenize a whole string
#[must_use]
pub fn tokenize(src: &str) -> Vec<HtmlToken<'_>> {
    Tokenizer::new(src).collect()
}

fn name_length(s: &str) -> usize {
    s.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':'))
        .count()
}

/// Parse attributes starting at `i`; returns attributes, self-closing flag
/// and the tag length including `>`. `None` if the tag never closes.
fn parse_attributes(tag: &str, mut i: usize) -> Option<(Vec<Attribute>, bool, usize)> {
    let bytes = tag.as_bytes();
    let mut attrs = Vec::new();

    loop {
        while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        match *bytes.get(i)? {
            b'>' => return Some((attrs, false, i + 1)),
            b'/' if bytes.get(i + 1) == Some(&b'>') => return Some((attrs, true, i + 2)),
            b'/' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let name_start = i;
        while let Some(&b) = bytes.get(i) {
            if b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/') {
                break;
            }
            i += 1;
        }
        if i == name_start {
            // stray '=' before any name
            i += 1;
            continue;
        }
        let name = tag[name_start..i].to_ascii_lowercase();

        let mut j = i;
        while bytes.get(j).is_some_and(u8::is_ascii_whitespace) {
            j += 1;
        }
        if bytes.get(j) != Some(&b'=') {
            attrs.push(Attribute { name, value: None });
            continue;
        }
        j += 1;
        while bytes.get(j).is_some_and(u8::is_ascii_whitespace) {
            j += 1;
        }

        let value = match *bytes.get(j)? {
            quote @ (b'"' | b'\'') => {
                let close = tag[j + 1..].find(char::from(quote))? + j + 1;
                let value = tag[j + 1..close].to_string();
                i = close + 1;
                value
            }
            _ => {
                let start = j;
                while let Some(&b) = bytes.get(j) {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    j += 1;
                }
                i = j;
                tag[start..j].to_string()
            }
        };
        attrs.push(Attribute {
            name,
            value: Some(value),
        });
    }
}

fn find_ignore_case(hay: &str, needle: &str) -> Option<usize> {
    let hay = hay.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    hay.windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(src: &str) -> Vec<String> {
        tokenize(src)
            .into_iter()
            .map(|t| match t {
                HtmlToken::Text(s) => format!("T:{s}"),
                HtmlToken::StartTag(tag) => format!("S:{}", tag.name),
                HtmlToken::EndTag { name, .. } => format!("E:{name}"),
                HtmlToken::Comment(_) => "C".to_string(),
                HtmlToken::Declaration(_) => "D".to_string(),
            })
            .collect()
    }

    #[test]
    fn splits_tags_and_text() {
        assert_eq!(
            names("<p>Hi <B>there</B></p>"),
            vec!["S:p", "T:Hi ", "S:b", "T:there", "E:b", "E:p"]
        );
    }

    #[test]
    fn parses_attributes() {
        let tokens = tokenize(r#"<a href="/x?a=1&amp;b" title='t > u' hidden data-x=y>"#);
        let HtmlToken::StartTag(tag) = &tokens[0] else {
            panic!("expected start tag");
        };
        assert_eq!(tag.attr("href"), Some("/x?a=1&amp;b"));
        assert_eq!(tag.attr("title"), Some("t > u"));
        assert_eq!(tag.attr("data-x"), Some("y"));
        assert!(tag.attrs.iter().any(|a| a.name == "hidden" && a.value.is_none()));
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn self_closing_and_void() {
        let tokens = tokenize("<br/><img src=x />");
        assert!(matches!(&tokens[0], HtmlToken::StartTag(t) if t.self_closing));
        assert!(matches!(&tokens[1], HtmlToken::StartTag(t) if t.self_closing && t.name == "img"));
        assert!(is_void("br"));
        assert!(!is_void("b"));
    }

    #[test]
    fn stray_angle_brackets_are_text() {
        let src = "a < b and <3 and <unterminated";
        let out: String = tokenize(src).iter().map(HtmlToken::raw).collect();
        assert_eq!(out, src);
        assert!(tokenize(src).iter().all(|t| matches!(t, HtmlToken::Text(_))));
    }

    #[test]
    fn comments_and_declarations() {
        assert_eq!(names("<!DOCTYPE html><!-- x --><p>"), vec!["D", "C", "S:p"]);
        assert_eq!(names("<!-- open"), vec!["C"]);
    }

    #[test]
    fn script_content_is_raw_text() {
        assert_eq!(
            names("<script>if (a<b) {}</script>x"),
            vec!["S:script", "T:if (a<b) {}", "E:script", "T:x"]
        );
    }

    #[test]
    fn tokens_cover_the_input() {
        let src = "<div class=\"a\">x &amp; y<!-- c --><br>z</div> < tail";
        let out: String = tokenize(src).iter().map(HtmlToken::raw).collect();
        assert_eq!(out, src);
    }
}
