//! HTML truncation for previews
//!
//! Cuts HTML to a visible-character budget and closes whatever was open at
//! the cut, innermost first.

use crate::entities::entity_len_at;
use crate::error::MarkupError;
use crate::sanitize::{text_len, visible_len};
use crate::tokenizer::{is_void, HtmlToken, Tokenizer};

/// Truncate `html` to at most `target_len` visible characters
///
/// Markup is not counted and each character reference counts as one. The
/// `ellipsis` (itself HTML) is appended at the cut and counted against the
/// budget; it is dropped when it would leave no room for any text. Input that
/// already fits is returned unchanged.
///
/// # Errors
/// Returns [`MarkupError::UnbalancedMarkup`] if the input's tags do not pair up
pub fn truncate(html: &str, target_len: usize, ellipsis: &str) -> Result<String, MarkupError> {
    check_balanced(html)?;

    if visible_len(html) <= target_len {
        return Ok(html.to_string());
    }

    let ellipsis_len = visible_len(ellipsis);
    let (budget, ellipsis) = if ellipsis_len < target_len {
        (target_len - ellipsis_len, ellipsis)
    } else {
        (target_len, "")
    };

    let mut out = String::with_capacity(html.len().min(target_len * 4 + 64));
    let mut open: Vec<String> = Vec::new();
    let mut remaining = budget;

    'tokens: for token in Tokenizer::new(html) {
        match token {
            HtmlToken::Text(text) => {
                let fits = text_len(text);
                if fits <= remaining {
                    push_text(&mut out, text);
                    remaining -= fits;
                    continue;
                }
                push_text(&mut out, cut_text(text, remaining));
                break 'tokens;
            }
            HtmlToken::StartTag(tag) => {
                if remaining == 0 {
                    break 'tokens;
                }
                if !tag.self_closing && !is_void(&tag.name) {
                    open.push(tag.name.clone());
                }
                out.push_str(tag.raw);
            }
            HtmlToken::EndTag { name, raw } => {
                if open.last() == Some(&name) {
                    open.pop();
                }
                out.push_str(raw);
            }
            HtmlToken::Comment(_) | HtmlToken::Declaration(_) => {}
        }
    }

    out.push_str(ellipsis);
    while let Some(name) = open.pop() {
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }
    Ok(out)
}

/// Append text, encoding a stray `<` so the cut cannot form a new tag
fn push_text(out: &mut String, text: &str) {
    if text.contains('<') {
        out.push_str(&text.replace('<', "&lt;"));
    } else {
        out.push_str(text);
    }
}

/// Longest prefix of encoded `text` holding `units` visible characters
fn cut_text(text: &str, units: usize) -> &str {
    let mut i = 0;
    for _ in 0..units {
        if i >= text.len() {
            break;
        }
        i += match entity_len_at(text, i) {
            Some(len) => len,
            None => text[i..].chars().next().map_or(1, char::len_utf8),
        };
    }
    &text[..i]
}

/// Verify every non-void start tag has a matching end tag
///
/// # Errors
/// Returns [`MarkupError::UnbalancedMarkup`] at the first mismatch
pub fn check_balanced(html: &str) -> Result<(), MarkupError> {
    let mut open: Vec<(String, usize)> = Vec::new();
    let mut tokens = Tokenizer::new(html);

    loop {
        let offset = tokens.offset();
        let Some(token) = tokens.next() else {
            break;
        };
        match token {
            HtmlToken::StartTag(tag) if !tag.self_closing && !is_void(&tag.name) => {
                open.push((tag.name, offset));
            }
            HtmlToken::EndTag { name, .. } if !is_void(&name) => match open.pop() {
                Some((top, _)) if top == name => {}
                Some((top, _)) => {
                    return Err(MarkupError::unbalanced(
                        offset,
                        format!("</{name}> closes <{top}>"),
                    ));
                }
                None => {
                    return Err(MarkupError::unbalanced(
                        offset,
                        format!("</{name}> has no open tag"),
                    ));
                }
            },
            _ => {}
        }
    }

    match open.pop() {
        Some((name, at)) => Err(MarkupError::unbalanced(
            html.len(),
            format!("<{name}> opened at byte {at} is never closed"),
        )),
        None => Ok(()),
    }
}
