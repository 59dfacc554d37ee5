//! "Context remaining" detection in agent output lines.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Maximum nesting depth searched in a JSON payload.
pub const MAX_SEARCH_DEPTH: usize = 32;

/// Normalized (lowercase, letters only) keys that carry a percent left.
const PERCENT_KEYS: &[&str] = &[
    "contextleftpercent",
    "contextleft",
    "remainingcontextpercent",
    "remainingcontext",
    "contextremainingpercent",
];

const MAX_TOKENS_KEY: &str = "max_context_tokens";
const USED_TOKENS_KEYS: &[&str] = &["prompt_tokens", "input_tokens"];

static CONTEXT_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:context(?:\s+left)?\s*[:=]\s*(\d{1,3})\s*%|(\d{1,3})\s*%\s*context(?:\s+left)?)",
    )
    .expect("context text pattern is valid")
});

/// Extract the context-left percentage from one raw output line.
///
/// JSON lines are searched structurally first; any line may then match a
/// free-text form such as `Context: 87%` or `42% context left`.
#[must_use]
pub fn extract_context_left_percent(raw_line: &str) -> Option<u8> {
    let line = raw_line.trim();
    if line.is_empty() {
        return None;
    }

    if let Ok(payload) = serde_json::from_str::<Value>(line) {
        if let Some(percent) = find_percent(&payload, 0) {
            return Some(percent);
        }
    }

    let caps = CONTEXT_TEXT.captures(line)?;
    let candidate = caps.get(1).or_else(|| caps.get(2))?;
    percent_from_text(candidate.as_str())
}

fn find_percent(value: &Value, depth: usize) -> Option<u8> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }

    match value {
        Value::Object(map) => find_in_object(map, depth),
        Value::Array(items) => items.iter().find_map(|item| find_percent(item, depth + 1)),
        _ => None,
    }
}

fn find_in_object(map: &Map<String, Value>, depth: usize) -> Option<u8> {
    let direct = map.iter().find_map(|(key, value)| {
        PERCENT_KEYS
            .contains(&normalize_key(key).as_str())
            .then(|| percent_from_value(value))
            .flatten()
    });
    if direct.is_some() {
        return direct;
    }

    if let Some(percent) = percent_from_token_counts(map) {
        return Some(percent);
    }

    map.values().find_map(|value| find_percent(value, depth + 1))
}

/// Derive percent left from a max/used token pair in the same object.
fn percent_from_token_counts(map: &Map<String, Value>) -> Option<u8> {
    let max = map.get(MAX_TOKENS_KEY)?.as_f64()?;
    let used = USED_TOKENS_KEYS
        .iter()
        .find_map(|key| map.get(*key))?
        .as_f64()?;
    if max <= 0.0 {
        return None;
    }
    let percent = ((max - used) / max * 100.0).round_ties_even();
    Some(clamp_percent(percent))
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

fn percent_from_value(value: &Value) -> Option<u8> {
    match value {
        Value::Number(number) => {
            let rounded = if let Some(int) = number.as_i64() {
                int
            } else {
                #[allow(clippy::cast_possible_truncation)]
                let rounded = number.as_f64()?.round_ties_even() as i64;
                rounded
            };
            u8::try_from(rounded).ok().filter(|percent| *percent <= 100)
        }
        Value::String(text) => percent_from_text(text.trim().trim_end_matches('%')),
        _ => None,
    }
}

fn percent_from_text(text: &str) -> Option<u8> {
    if text.is_empty() || !text.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    text.parse::<u32>()
        .ok()
        .filter(|percent| *percent <= 100)
        .and_then(|percent| u8::try_from(percent).ok())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_percent(value: f64) -> u8 {
    value.clamp(0.0, 100.0) as u8
}
