//! Field label canonicalization.
//!
//! Generated documents spell the same field many ways ("CTA (max 2 words)",
//! "Optional List Title", "title for optional list"). Everything downstream
//! works on canonical names only.

use std::sync::LazyLock;

use regex::Regex;

/// Canonical name of the single list-typed field.
pub const LIST_FIELD: &str = "Optional List";

/// Known display fields, in the order a presentation layer shows them.
pub const DISPLAY_FIELD_ORDER: &[&str] = &[
    "Graphic Title",
    "Graphic Subtitle",
    "CTA",
    "Title for Optional List",
    LIST_FIELD,
    "Website",
    "Phone Number",
    "Email",
    "Canva Picture Keyword",
    "Canva Design Keyword",
    "Caption 1",
    "Caption 2",
    "Caption 3",
];

/// Fields whose value spans every line until the next recognized field.
pub const MULTILINE_FIELDS: &[&str] = &["Caption 1", "Caption 2", "Caption 3"];

/// Lowercased synonym -> canonical name.
const SYNONYMS: &[(&str, &str)] = &[
    ("graphic title", "Graphic Title"),
    ("graphic subtitle", "Graphic Subtitle"),
    ("cta", "CTA"),
    ("title for optional list", "Title for Optional List"),
    ("optional list title", "Title for Optional List"),
    ("optional list", LIST_FIELD),
    ("website", "Website"),
    ("phone number", "Phone Number"),
    ("email", "Email"),
    ("canva picture keyword", "Canva Picture Keyword"),
    ("canva design keyword", "Canva Design Keyword"),
    ("caption 1", "Caption 1"),
    ("caption 2", "Caption 2"),
    ("caption 3", "Caption 3"),
];

static TRAILING_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("trailing hint pattern is valid"));

/// Normalize a raw field label to its canonical name.
///
/// Whitespace runs collapse to single spaces, a trailing parenthetical hint
/// such as `(max 2 words)` is dropped, and the result is looked up
/// case-insensitively in the synonym table. Unknown labels pass through in
/// their cleaned, as-written form.
#[must_use]
pub fn canonicalize(label: &str) -> String {
    let collapsed = label.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_hint = TRAILING_HINT.replace(&collapsed, "");
    let cleaned = without_hint.trim();

    let lowered = cleaned.to_lowercase();
    SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == lowered)
        .map_or_else(|| cleaned.to_string(), |(_, canonical)| (*canonical).to_string())
}

/// Returns true if `name` is one of the known display fields.
#[must_use]
pub fn is_display_field(name: &str) -> bool {
    DISPLAY_FIELD_ORDER.contains(&name)
}

/// Returns true if `name` is the list-typed field.
#[must_use]
pub fn is_list_field(name: &str) -> bool {
    name == LIST_FIELD
}

/// Returns true if `name` accumulates continuation lines.
///
/// Besides the fixed caption fields, any field whose name starts with
/// "caption" (case-insensitive) is multiline.
#[must_use]
pub fn is_multiline_field(name: &str) -> bool {
    MULTILINE_FIELDS.contains(&name) || name.to_lowercase().starts_with("caption")
}
