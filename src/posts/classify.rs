//! Line classification for post documents.

use std::sync::LazyLock;

use regex::Regex;

use super::canonical::{canonicalize, is_display_field};

static POST_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:#{1,6}\s+)?(Post\s+(\d+)\b.*)$").expect("post header pattern is valid")
});

static NUMBERED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+[A-Za-z]?)\.\s+(.*\S)\s*$").expect("numbered field pattern is valid")
});

static DASH_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.+?)\s+-\s*(.*)$").expect("dash field pattern is valid"));

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s+(.*\S)\s*$").expect("bullet pattern is valid"));

/// A field label/value pair resolved from one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLine {
    /// Canonical field name.
    pub name: String,
    /// Trimmed inline value (may be empty).
    pub value: String,
}

/// Classification of a single document line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// `Post <n> ...`, optionally behind heading markup.
    PostHeader {
        /// Full header text without heading markup.
        header: String,
        /// Parsed post number, `None` if it does not fit in a `u64`.
        number: Option<u64>,
    },
    /// `<n>. Label - value` or `<n>. Label: value`.
    NumberedField(FieldLine),
    /// `Label: value` where the label is a known display field.
    UnnumberedField(FieldLine),
    /// `- item` or `* item`.
    Bullet(String),
    /// Anything else.
    Continuation,
}

impl LineKind {
    /// The resolved field, if this line is a field of either kind.
    #[must_use]
    pub fn field(&self) -> Option<&FieldLine> {
        match self {
            Self::NumberedField(field) | Self::UnnumberedField(field) => Some(field),
            _ => None,
        }
    }
}

/// Classify one line.
///
/// Header wins over everything; then the numbered-field test, then the
/// unnumbered fallback, then bullets.
#[must_use]
pub fn classify(line: &str) -> LineKind {
    if let Some((header, number)) = parse_post_header(line) {
        return LineKind::PostHeader { header, number };
    }
    if let Some(field) = parse_numbered_field(line) {
        return LineKind::NumberedField(field);
    }
    if let Some(field) = parse_unnumbered_field(line) {
        return LineKind::UnnumberedField(field);
    }
    if let Some(item) = parse_bullet(line) {
        return LineKind::Bullet(item);
    }
    LineKind::Continuation
}

/// Match a post header, returning the header text and post number.
#[must_use]
pub fn parse_post_header(line: &str) -> Option<(String, Option<u64>)> {
    let caps = POST_HEADER.captures(line)?;
    let header = caps.get(1)?.as_str().trim().to_string();
    let number = caps.get(2).and_then(|m| m.as_str().parse::<u64>().ok());
    Some((header, number))
}

/// Match an enumerated field line such as `3. CTA (max 2 words) - Book Now`.
///
/// The remainder after the enumeration token is split dash-first, then
/// colon. Labels that canonicalize to nothing are rejected.
#[must_use]
pub fn parse_numbered_field(line: &str) -> Option<FieldLine> {
    let caps = NUMBERED_FIELD.captures(line)?;
    let remainder = caps.get(2)?.as_str().trim();

    [split_dash(remainder), split_colon(remainder)]
        .into_iter()
        .flatten()
        .find_map(|(label, value)| {
            let name = canonicalize(label);
            (!name.is_empty()).then(|| FieldLine {
                name,
                value: value.trim().to_string(),
            })
        })
}

/// Match an unnumbered `Label: value` / `Label - value` line.
///
/// Only accepted when the label canonicalizes to a known display field, so
/// arbitrary prose with punctuation is never mistaken for a field.
#[must_use]
pub fn parse_unnumbered_field(line: &str) -> Option<FieldLine> {
    [split_colon(line), split_dash(line)]
        .into_iter()
        .flatten()
        .find_map(|(label, value)| {
            let name = canonicalize(label);
            is_display_field(&name).then(|| FieldLine {
                name,
                value: value.trim().to_string(),
            })
        })
}

/// Match a bullet line, returning its trimmed content.
#[must_use]
pub fn parse_bullet(line: &str) -> Option<String> {
    BULLET
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Split `label - value` at the first dash preceded by whitespace.
fn split_dash(text: &str) -> Option<(&str, &str)> {
    let caps = DASH_FIELD.captures(text)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Split `label: value` at the first colon not followed by `/`.
///
/// URLs (`https://...`) in a value or label therefore do not split.
fn split_colon(text: &str) -> Option<(&str, &str)> {
    let leading = text.len() - text.trim_start().len();
    let body = &text[leading..];
    let pos = body.char_indices().find_map(|(idx, ch)| {
        (ch == ':' && idx > 0 && !body[idx + 1..].starts_with('/')).then_some(idx)
    })?;
    Some((body[..pos].trim_end(), body[pos + 1..].trim_start()))
}
