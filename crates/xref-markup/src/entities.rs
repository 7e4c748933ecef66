//! Character references

use std::borrow::Cow;

/// Length of the character reference starting at byte `i`, if one does
///
/// Recognizes `&name;`, `&#NN;` and `&#xHH;`.
#[must_use]
pub fn entity_len_at(s: &str, i: usize) -> Option<usize> {
    let rest = s.as_bytes().get(i..)?;
    if rest.first() != Some(&b'&') {
        return None;
    }

    let body = match rest.get(1) {
        Some(b'#') => match rest.get(2) {
            Some(b'x' | b'X') => 3 + count(&rest[3..], u8::is_ascii_hexdigit),
            _ => 2 + count(&rest[2..], u8::is_ascii_digit),
        },
        Some(b) if b.is_ascii_alphabetic() => 1 + count(&rest[1..], u8::is_ascii_alphanumeric),
        _ => return None,
    };

    let digits_start = match rest.get(1) {
        Some(b'#') if matches!(rest.get(2), Some(b'x' | b'X')) => 3,
        Some(b'#') => 2,
        _ => 1,
    };
    if body == digits_start || body - digits_start > 32 {
        return None;
    }
    (rest.get(body) == Some(&b';')).then_some(body + 1)
}

fn count(bytes: &[u8], pred: fn(&u8) -> bool) -> usize {
    bytes.iter().take_while(|b| pred(b)).count()
}

/// Decode the common named and all numeric character references
///
/// Unknown names are left encoded.
#[must_use]
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        if let Some(len) = entity_len_at(s, i) {
            let entity = &s[i..i + len];
            if let Some(c) = decode_one(&entity[1..len - 1]) {
                out.push(c);
                i += len;
                continue;
            }
        }
        let Some(c) = s[i..].chars().next() else {
            break;
        };
        out.push(c);
        i += c.len_utf8();
    }
    Cow::Owned(out)
}

fn decode_one(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "colon" => ':',
        "tab" => '\t',
        "newline" => '\n',
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_entity_forms() {
        assert_eq!(entity_len_at("&amp;x", 0), Some(5));
        assert_eq!(entity_len_at("&#39;", 0), Some(5));
        assert_eq!(entity_len_at("&#x1F600;", 0), Some(9));
        assert_eq!(entity_len_at("&hellip;", 0), Some(8));
    }

    #[test]
    fn rejects_bare_ampersands() {
        assert_eq!(entity_len_at("& b", 0), None);
        assert_eq!(entity_len_at("&amp", 0), None);
        assert_eq!(entity_len_at("&#;", 0), None);
        assert_eq!(entity_len_at("&#x;", 0), None);
    }

    #[test]
    fn decodes_known_references() {
        assert_eq!(decode_entities("a &amp; b &#106;&#x61;"), "a & b ja");
        assert_eq!(decode_entities("&hellip;"), "&hellip;");
        assert_eq!(decode_entities("plain"), "plain");
    }
}
