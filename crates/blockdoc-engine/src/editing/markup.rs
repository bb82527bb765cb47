//! Offset arithmetic over inline rich-text fragments.
//!
//! Block content is a small HTML fragment (`<b>`, `<i>`, `<a>`, `<br>`, entities).
//! Editing surfaces report carets as offsets into the *plain text* of that
//! fragment, so everything here maps plain-text character offsets onto the
//! markup without disturbing tags. Tags contribute zero characters and an
//! entity such as `&amp;` counts as the characters it decodes to.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Open,
    Close,
    Void,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tag<'a> {
    pub raw: &'a str,
    pub name: String,
    pub kind: TagKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Tag(Tag<'a>),
    Text(&'a str),
}

const VOID_ELEMENTS: [&str; 6] = ["br", "img", "hr", "input", "wbr", "source"];

fn tag_regex() -> &'static Regex {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    TAG_REGEX.get_or_init(|| {
        Regex::new(r"<!--[\s\S]*?-->|<(/?)([a-zA-Z][a-zA-Z0-9-]*)\b[^>]*?(/?)>")
            .expect("Invalid tag regex")
    })
}

fn entity_regex() -> &'static Regex {
    static ENTITY_REGEX: OnceLock<Regex> = OnceLock::new();
    ENTITY_REGEX.get_or_init(|| {
        Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);")
            .expect("Invalid entity regex")
    })
}

pub(crate) fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut cursor = 0;
    for captures in tag_regex().captures_iter(html) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if whole.start() > cursor {
            tokens.push(Token::Text(&html[cursor..whole.start()]));
        }
        cursor = whole.end();

        let Some(name) = captures.get(2) else {
            // comment
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = captures.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = captures.get(3).is_some_and(|m| !m.as_str().is_empty());
        let kind = if closing {
            TagKind::Close
        } else if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
            TagKind::Void
        } else {
            TagKind::Open
        };
        tokens.push(Token::Tag(Tag {
            raw: whole.as_str(),
            name,
            kind,
        }));
    }
    if cursor < html.len() {
        tokens.push(Token::Text(&html[cursor..]));
    }
    tokens
}

/// A piece of raw text that is indivisible for offset purposes.
struct Unit<'a> {
    raw: &'a str,
    chars: usize,
}

fn units(text: &str) -> Vec<Unit<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for entity in entity_regex().find_iter(text) {
        for (i, ch) in text[cursor..entity.start()].char_indices() {
            let start = cursor + i;
            out.push(Unit {
                raw: &text[start..start + ch.len_utf8()],
                chars: 1,
            });
        }
        let decoded = html_escape::decode_html_entities(entity.as_str());
        out.push(Unit {
            raw: entity.as_str(),
            chars: decoded.chars().count(),
        });
        cursor = entity.end();
    }
    for (i, ch) in text[cursor..].char_indices() {
        let start = cursor + i;
        out.push(Unit {
            raw: &text[start..start + ch.len_utf8()],
            chars: 1,
        });
    }
    out
}

fn text_chars(text: &str) -> usize {
    units(text).iter().map(|unit| unit.chars).sum()
}

/// Byte offset inside raw `text` for a plain-text offset, snapping to the
/// start of an entity when the offset falls inside one.
fn text_byte_offset(text: &str, plain_offset: usize) -> usize {
    let mut seen = 0;
    let mut bytes = 0;
    for unit in units(text) {
        if seen + unit.chars > plain_offset {
            break;
        }
        seen += unit.chars;
        bytes += unit.raw.len();
    }
    bytes
}

/// Strip tags and decode entities.
pub fn to_plain_text(html: &str) -> String {
    tokenize(html)
        .into_iter()
        .filter_map(|token| match token {
            Token::Text(text) => Some(html_escape::decode_html_entities(text).into_owned()),
            Token::Tag(_) => None,
        })
        .collect()
}

/// Length of the plain text in characters.
pub fn plain_len(html: &str) -> usize {
    tokenize(html)
        .into_iter()
        .map(|token| match token {
            Token::Text(text) => text_chars(text),
            Token::Tag(_) => 0,
        })
        .sum()
}

/// Plain text between two plain-text offsets.
pub fn plain_slice(html: &str, start: usize, end: usize) -> String {
    let (start, end) = ordered(start, end);
    to_plain_text(html)
        .chars()
        .skip(start)
        .take(end - start)
        .collect()
}

pub fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Replace the plain-text range `start..end` with `replacement` markup.
///
/// Tags inside the range are kept so the surrounding structure stays balanced.
/// The replacement lands before any element that opens at `start` and after
/// any element that closes there. A range past the end appends.
pub fn replace_range(html: &str, start: usize, end: usize, replacement: &str) -> String {
    let (start, end) = ordered(start, end);
    let mut out = String::with_capacity(html.len() + replacement.len());
    let mut pos = 0;
    let mut inserted = false;

    for token in tokenize(html) {
        match token {
            Token::Tag(tag) => {
                if !inserted && pos >= start && tag.kind != TagKind::Close {
                    out.push_str(replacement);
                    inserted = true;
                }
                out.push_str(tag.raw);
            }
            Token::Text(text) => {
                for unit in units(text) {
                    if !inserted && pos >= start {
                        out.push_str(replacement);
                        inserted = true;
                    }
                    let inside = pos >= start && pos < end;
                    if !inside {
                        out.push_str(unit.raw);
                    }
                    pos += unit.chars;
                }
            }
        }
    }
    if !inserted {
        out.push_str(replacement);
    }
    out
}

pub fn insert_at(html: &str, offset: usize, markup: &str) -> String {
    replace_range(html, offset, offset, markup)
}

/// Split a fragment at a plain-text offset into two well-formed fragments.
///
/// Elements open at the split point are closed at the end of the left half and
/// re-opened at the start of the right half.
pub fn split_at(html: &str, offset: usize) -> (String, String) {
    let tokens = tokenize(html);
    let mut left = String::new();
    let mut open: Vec<(String, &str)> = Vec::new();
    let mut remaining = offset;

    for (index, token) in tokens.iter().enumerate() {
        let split_before = remaining == 0
            && match token {
                Token::Tag(tag) => tag.kind != TagKind::Close,
                Token::Text(text) => !text.is_empty(),
            };
        if split_before {
            return finish_split(left, &open, String::new(), &tokens[index..]);
        }

        match token {
            Token::Tag(tag) => {
                match tag.kind {
                    TagKind::Open => open.push((tag.name.clone(), tag.raw)),
                    TagKind::Close => {
                        if let Some(at) = open.iter().rposition(|(name, _)| *name == tag.name) {
                            open.truncate(at);
                        }
                    }
                    TagKind::Void => {}
                }
                left.push_str(tag.raw);
            }
            Token::Text(text) => {
                let chars = text_chars(text);
                if remaining < chars {
                    let at = text_byte_offset(text, remaining);
                    left.push_str(&text[..at]);
                    return finish_split(left, &open, text[at..].to_string(), &tokens[index + 1..]);
                }
                remaining -= chars;
                left.push_str(text);
            }
        }
    }
    (left, String::new())
}

fn finish_split(
    mut left: String,
    open: &[(String, &str)],
    right_text: String,
    rest: &[Token<'_>],
) -> (String, String) {
    let mut right = String::new();
    for (name, _) in open.iter().rev() {
        left.push_str("</");
        left.push_str(name);
        left.push('>');
    }
    for (_, raw) in open {
        right.push_str(raw);
    }
    right.push_str(&right_text);
    for token in rest {
        match token {
            Token::Tag(tag) => right.push_str(tag.raw),
            Token::Text(text) => right.push_str(text),
        }
    }
    (left, right)
}
