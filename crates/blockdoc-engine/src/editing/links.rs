//! Inline hyperlink markup.
//!
//! Anchors inside block content are atomic, non-editable islands that always
//! open in a new tab with a safe `rel`. Every function here is pure over a
//! markup string.

use regex::Regex;
use std::sync::OnceLock;

use crate::editing::markup::{self, TagKind, Token};

pub const LINK_CLASS: &str = "inline-editor-link";

/// Attributes rewritten on every anchor, in output order.
const MANAGED_ATTRIBUTES: [(&str, &str); 3] = [
    ("target", "_blank"),
    ("rel", "noopener noreferrer"),
    ("contenteditable", "false"),
];

fn anchor_open_regex() -> &'static Regex {
    static ANCHOR_REGEX: OnceLock<Regex> = OnceLock::new();
    ANCHOR_REGEX.get_or_init(|| Regex::new(r"(?i)<a\b([^>]*)>").expect("Invalid anchor regex"))
}

fn attribute_regex() -> &'static Regex {
    static ATTRIBUTE_REGEX: OnceLock<Regex> = OnceLock::new();
    ATTRIBUTE_REGEX.get_or_init(|| {
        Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("Invalid attribute regex")
    })
}

fn url_regex() -> &'static Regex {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    URL_REGEX.get_or_init(|| Regex::new(r"^https?://\S+$").expect("Invalid URL regex"))
}

/// Build the canonical anchor fragment. Visible text falls back to the href.
pub fn create_anchor_html(href: &str, text: Option<&str>) -> String {
    let visible = text.filter(|t| !t.is_empty()).unwrap_or(href);
    format!(
        r#"<a href="{}" target="_blank" rel="noopener noreferrer" contenteditable="false" class="{LINK_CLASS}" data-inline-link="1">{}</a>"#,
        html_escape::encode_double_quoted_attribute(href),
        html_escape::encode_text(visible),
    )
}

/// Whether pasted text is a single bare URL that should become an anchor.
pub fn is_url(text: &str) -> bool {
    url_regex().is_match(text.trim())
}

/// Rewrite every anchor to carry the managed attributes and link class.
///
/// `href` stays first and unrelated attributes keep their order. Running it
/// twice gives the same output as running it once.
pub fn normalize_anchors(html: &str) -> String {
    anchor_open_regex()
        .replace_all(html, |captures: &regex::Captures<'_>| {
            let attributes = captures.get(1).map_or("", |m| m.as_str());
            normalize_anchor_tag(attributes)
        })
        .into_owned()
}

fn normalize_anchor_tag(attributes: &str) -> String {
    let mut href = None;
    let mut classes: Vec<String> = Vec::new();
    let mut kept: Vec<(String, Option<String>)> = Vec::new();

    for captures in attribute_regex().captures_iter(attributes) {
        let Some(name) = captures.get(1) else {
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        let value = captures
            .get(2)
            .or_else(|| captures.get(3))
            .or_else(|| captures.get(4))
            .map(|m| m.as_str().replace('"', "&quot;"));

        match name.as_str() {
            "href" => href = value,
            "class" => {
                classes = value
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
            }
            "target" | "rel" | "contenteditable" | "data-inline-link" => {}
            _ => kept.push((name, value)),
        }
    }
    if !classes.iter().any(|class| class == LINK_CLASS) {
        classes.push(LINK_CLASS.to_string());
    }

    let mut tag = String::from("<a");
    if let Some(href) = href {
        tag.push_str(&format!(r#" href="{href}""#));
    }
    for (name, value) in kept {
        match value {
            Some(value) => tag.push_str(&format!(r#" {name}="{value}""#)),
            None => tag.push_str(&format!(" {name}")),
        }
    }
    for (name, value) in MANAGED_ATTRIBUTES {
        tag.push_str(&format!(r#" {name}="{value}""#));
    }
    tag.push_str(&format!(r#" class="{}""#, classes.join(" ")));
    tag.push_str(r#" data-inline-link="1">"#);
    tag
}

/// An anchor found in a fragment, located by plain-text offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSpan {
    pub href: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

pub fn anchors(html: &str) -> Vec<AnchorSpan> {
    let mut spans = Vec::new();
    let mut pos = 0;
    let mut current: Option<(String, usize, String)> = None;

    for token in markup::tokenize(html) {
        match token {
            Token::Tag(tag) if tag.name == "a" && tag.kind == TagKind::Open => {
                current = Some((href_of(tag.raw).unwrap_or_default(), pos, String::new()));
            }
            Token::Tag(tag) if tag.name == "a" && tag.kind == TagKind::Close => {
                if let Some((href, start, text)) = current.take() {
                    spans.push(AnchorSpan {
                        href,
                        text,
                        start,
                        end: pos,
                    });
                }
            }
            Token::Tag(_) => {}
            Token::Text(text) => {
                let decoded = html_escape::decode_html_entities(text);
                pos += decoded.chars().count();
                if let Some((_, _, inner)) = current.as_mut() {
                    inner.push_str(&decoded);
                }
            }
        }
    }
    spans
}

fn href_of(open_tag: &str) -> Option<String> {
    let inner = open_tag.trim_start_matches('<').trim_end_matches('>');
    attribute_regex().captures_iter(inner).find_map(|captures| {
        let name = captures.get(1)?;
        if !name.as_str().eq_ignore_ascii_case("href") {
            return None;
        }
        let value = captures
            .get(2)
            .or_else(|| captures.get(3))
            .or_else(|| captures.get(4))?;
        Some(html_escape::decode_html_entities(value.as_str()).into_owned())
    })
}

/// Replace the `index`-th anchor, tags and contents, with `replacement`.
/// `None` when there is no such anchor.
pub fn replace_anchor(html: &str, index: usize, replacement: &str) -> Option<String> {
    rewrite_anchor(html, index, |_| replacement.to_string(), false)
}

/// Remove the `index`-th anchor's tags, keeping its contents in place.
pub fn unlink(html: &str, index: usize) -> Option<String> {
    rewrite_anchor(html, index, |_| String::new(), true)
}

fn rewrite_anchor(
    html: &str,
    index: usize,
    replacement: impl FnOnce(&str) -> String,
    keep_contents: bool,
) -> Option<String> {
    let mut out = String::with_capacity(html.len());
    let mut seen = 0;
    let mut inside = false;
    let mut found = false;
    let mut replacement = Some(replacement);

    for token in markup::tokenize(html) {
        match token {
            Token::Tag(tag) if tag.name == "a" && tag.kind == TagKind::Open && !inside => {
                if seen == index {
                    inside = true;
                    found = true;
                    if let Some(build) = replacement.take() {
                        out.push_str(&build(tag.raw));
                    }
                } else {
                    out.push_str(tag.raw);
                }
                seen += 1;
            }
            Token::Tag(tag) if tag.name == "a" && tag.kind == TagKind::Close && inside => {
                inside = false;
            }
            Token::Tag(tag) => {
                if !inside || keep_contents {
                    out.push_str(tag.raw);
                }
            }
            Token::Text(text) => {
                if !inside || keep_contents {
                    out.push_str(text);
                }
            }
        }
    }
    found.then_some(out)
}
