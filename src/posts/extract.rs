//! Single-pass extraction of post records from a markdown document.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::canonical::{is_display_field, is_list_field, is_multiline_field};
use super::classify::{classify, parse_bullet, parse_post_header, FieldLine, LineKind};

/// Reserved key for the post header in serialized records.
pub const POST_HEADER_KEY: &str = "Post Header";
/// Reserved key for the post number in serialized records.
pub const POST_NUMBER_KEY: &str = "Post Number";

/// Value of one post field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Single (possibly multi-line) text value.
    Text(String),
    /// Ordered items of the list field.
    List(Vec<String>),
}

impl FieldValue {
    /// The text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::List(_) => None,
        }
    }

    /// The items, if this is a list value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            Self::Text(_) => None,
        }
    }
}

/// One structured post idea.
///
/// Field order is first-appearance order in the source document. Re-stating
/// a field replaces its value in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    header: String,
    number: Option<u64>,
    fields: Vec<(String, FieldValue)>,
}

impl PostRecord {
    fn new(header: String, number: Option<u64>) -> Self {
        Self {
            header,
            number,
            fields: Vec::new(),
        }
    }

    /// Full header line text, e.g. `Post 2 - Carousel`.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Post number parsed from the header.
    #[must_use]
    pub fn number(&self) -> Option<u64> {
        self.number
    }

    /// Display fields in document order. Metadata is not included.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Look up a field by canonical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Text value of a field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// List value of a field.
    #[must_use]
    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(FieldValue::as_list)
    }

    /// Number of display fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if no display field was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn set(&mut self, name: String, value: FieldValue) {
        if let Some(slot) = self.fields.iter_mut().find(|(field, _)| *field == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }
}

impl Serialize for PostRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        map.serialize_entry(POST_HEADER_KEY, &self.header)?;
        if let Some(number) = self.number {
            map.serialize_entry(POST_NUMBER_KEY, &number)?;
        }
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Coarse outcome of an extraction, for caller messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStatus {
    /// The document contained no post header at all.
    NoPosts,
    /// Headers were found but none of them carried a field.
    NoFields,
    /// At least one post has fields.
    Fields,
}

impl ExtractStatus {
    /// Classify an extraction result.
    #[must_use]
    pub fn of(posts: &[PostRecord]) -> Self {
        if posts.is_empty() {
            Self::NoPosts
        } else if posts.iter().all(PostRecord::is_empty) {
            Self::NoFields
        } else {
            Self::Fields
        }
    }
}

/// Extract all posts from a document.
///
/// Never fails: lines that match nothing, and anything before the first
/// header, are skipped.
#[must_use]
pub fn extract_posts(text: &str) -> Vec<PostRecord> {
    let lines: Vec<&str> = text.lines().collect();
    let mut posts = Vec::new();
    let mut current: Option<PostRecord> = None;
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index].trim_end();

        match classify(line) {
            LineKind::PostHeader { header, number } => {
                if let Some(done) = current.take() {
                    posts.push(done);
                }
                tracing::trace!(line = index + 1, %header, "Post header");
                current = Some(PostRecord::new(header, number));
                index += 1;
            }
            LineKind::NumberedField(field) | LineKind::UnnumberedField(field) => {
                let Some(post) = current.as_mut() else {
                    index += 1;
                    continue;
                };
                index = apply_field(post, field, &lines, index);
            }
            LineKind::Bullet(_) | LineKind::Continuation => index += 1,
        }
    }

    if let Some(done) = current {
        posts.push(done);
    }

    tracing::debug!(posts = posts.len(), "Extracted posts");
    posts
}

/// Store one field into `post`, consuming any lines that belong to it.
///
/// Returns the index of the next unconsumed line.
fn apply_field(post: &mut PostRecord, field: FieldLine, lines: &[&str], index: usize) -> usize {
    let FieldLine { name, value } = field;

    if is_list_field(&name) {
        let mut items = split_list_items(&value);
        let mut next = index + 1;
        while let Some(item) = lines.get(next).and_then(|line| parse_bullet(line)) {
            items.extend(split_list_items(&item));
            next += 1;
        }
        post.set(name, FieldValue::List(items));
        return next;
    }

    if is_multiline_field(&name) {
        let mut content: Vec<&str> = Vec::new();
        if !value.is_empty() {
            content.push(&value);
        }
        let mut next = index + 1;
        while let Some(raw) = lines.get(next) {
            let line = raw.trim_end();
            if ends_multiline(line, &name) {
                break;
            }
            content.push(line);
            next += 1;
        }
        let joined = content.join("\n");
        post.set(name, FieldValue::Text(joined.trim().to_string()));
        return next;
    }

    post.set(name, FieldValue::Text(value));
    index + 1
}

/// A multiline block ends at a post header or a different known display field.
fn ends_multiline(line: &str, current: &str) -> bool {
    if parse_post_header(line).is_some() {
        return true;
    }
    classify(line)
        .field()
        .is_some_and(|next| is_display_field(&next.name) && next.name != current)
}

/// Split an inline list value on semicolons, dropping empty items.
#[must_use]
pub fn split_list_items(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
