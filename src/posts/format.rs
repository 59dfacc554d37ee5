//! Presentation helpers for extracted posts.

use super::canonical::DISPLAY_FIELD_ORDER;
use super::extract::{FieldValue, PostRecord};

/// Message shown when a document yields no posts.
pub const NO_POSTS_MESSAGE: &str = "No structured post fields were detected in this markdown file.";

/// Flatten a post into `(label, value)` rows for display.
///
/// Known display fields come first in their preferred order, followed by
/// any other fields in document order. A list expands into numbered rows
/// (`Optional List 1`, `Optional List 2`, ...).
#[must_use]
pub fn display_rows(post: &PostRecord) -> Vec<(String, String)> {
    let mut rows = Vec::new();

    for name in DISPLAY_FIELD_ORDER {
        if let Some(value) = post.get(name) {
            push_rows(&mut rows, name, value);
        }
    }
    for (name, value) in post.fields() {
        if !DISPLAY_FIELD_ORDER.contains(&name) {
            push_rows(&mut rows, name, value);
        }
    }

    rows
}

fn push_rows(rows: &mut Vec<(String, String)>, name: &str, value: &FieldValue) {
    match value {
        FieldValue::Text(text) => rows.push((name.to_string(), text.clone())),
        FieldValue::List(items) if items.is_empty() => rows.push((name.to_string(), String::new())),
        FieldValue::List(items) => {
            for (idx, item) in items.iter().enumerate() {
                rows.push((format!("{name} {}", idx + 1), item.clone()));
            }
        }
    }
}

/// Render one post of a document as plain text.
///
/// `index` is clamped into range.
#[must_use]
pub fn format_post_view(posts: &[PostRecord], index: usize) -> String {
    if posts.is_empty() {
        return NO_POSTS_MESSAGE.to_string();
    }

    let index = index.min(posts.len() - 1);
    let post = &posts[index];

    let title = if !post.header().is_empty() {
        post.header().to_string()
    } else if let Some(number) = post.number() {
        format!("Post {number}")
    } else {
        format!("Post {}", index + 1)
    };

    let mut lines = vec![
        title,
        format!("Viewing {} of {}", index + 1, posts.len()),
        "-".repeat(40),
    ];

    for (name, value) in post.fields() {
        match value {
            FieldValue::List(items) => {
                lines.push(format!("{name}:"));
                lines.extend(items.iter().map(|item| format!("- {item}")));
            }
            FieldValue::Text(text) => lines.push(format!("{name}: {text}")),
        }
    }

    lines.join("\n").trim_end().to_string()
}
