//! Display formatting for generation output lines.
//!
//! Generation processes emit a mix of JSON events and plain text. JSON
//! events are reduced to their event type and the human-readable text found
//! in well-known fields; everything else passes through untouched.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Deepest nesting visited when collecting text fragments.
const MAX_FRAGMENT_DEPTH: usize = 6;
/// Longer strings are treated as payload dumps, not text.
const MAX_FRAGMENT_CHARS: usize = 500;
/// Only the head of each list is visited.
const MAX_LIST_ITEMS: usize = 12;

const TEXT_KEYS: &[&str] = &[
    "text",
    "delta",
    "output_text",
    "content",
    "message",
    "reason",
    "error",
    "stdout",
    "stderr",
];
const CONTAINER_KEYS: &[&str] = &["item", "output", "result", "value", "data", "details"];

/// Render one raw output line for display.
///
/// Returns `None` when the line has nothing worth showing: blank lines, and
/// `item.*` events without text or an item type.
#[must_use]
pub fn format_log_line(raw_line: &str) -> Option<String> {
    let line = raw_line.trim();
    if line.is_empty() {
        return None;
    }

    let Ok(Value::Object(payload)) = serde_json::from_str::<Value>(line) else {
        return Some(raw_line.to_string());
    };

    let event_type = payload.get("type").and_then(Value::as_str);
    let fragments = text_fragments(&payload);

    if !fragments.is_empty() {
        let text = fragments.join(" ");
        return Some(match event_type {
            Some(event_type) => format!("[{event_type}] {text}"),
            None => text,
        });
    }

    match event_type {
        Some(event_type @ ("item.started" | "item.completed")) => payload
            .get("item")
            .and_then(|item| item.get("type"))
            .and_then(Value::as_str)
            .map(|item_type| format!("[{event_type}] {item_type}")),
        Some(event_type) => Some(format!("[{event_type}]")),
        None => Some(raw_line.to_string()),
    }
}

/// Human-readable strings under text and container keys, deduplicated in
/// first-seen order.
fn text_fragments(payload: &Map<String, Value>) -> Vec<String> {
    let mut fragments = Vec::new();
    visit_object(payload, 0, &mut fragments);

    let mut seen = HashSet::new();
    fragments.retain(|fragment| seen.insert(fragment.clone()));
    fragments
}

fn visit(value: &Value, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_FRAGMENT_DEPTH {
        return;
    }

    match value {
        Value::String(text) => {
            let text = text.trim();
            if !text.is_empty()
                && text.chars().count() <= MAX_FRAGMENT_CHARS
                && !text.starts_with('{')
                && !text.starts_with('[')
            {
                out.push(text.to_string());
            }
        }
        Value::Object(map) => visit_object(map, depth, out),
        Value::Array(items) => {
            for item in items.iter().take(MAX_LIST_ITEMS) {
                visit(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

fn visit_object(map: &Map<String, Value>, depth: usize, out: &mut Vec<String>) {
    for (key, nested) in map {
        let key = key.to_lowercase();
        if TEXT_KEYS.contains(&key.as_str()) || CONTAINER_KEYS.contains(&key.as_str()) {
            visit(nested, depth + 1, out);
        }
    }
}

/// Turn-level progress reported by a generation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationPhase {
    TurnStarted,
    TurnCompleted,
    TurnFailed,
    Error,
}

impl GenerationPhase {
    /// Detect a phase change from a raw JSON event line.
    #[must_use]
    pub fn from_line(raw_line: &str) -> Option<Self> {
        let payload: Value = serde_json::from_str(raw_line.trim()).ok()?;
        match payload.get("type")?.as_str()? {
            "turn.started" => Some(Self::TurnStarted),
            "turn.completed" => Some(Self::TurnCompleted),
            "turn.failed" => Some(Self::TurnFailed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Status text for this phase.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::TurnStarted => "turn started",
            Self::TurnCompleted => "turn completed",
            Self::TurnFailed => "turn failed",
            Self::Error => "error encountered",
        }
    }
}

/// Styling class of a displayed log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    Error,
    Status,
    System,
    Model,
}

impl LogTag {
    /// Pick the tag for a display line, if any.
    #[must_use]
    pub fn classify(line: &str) -> Option<Self> {
        let lower = line.to_lowercase();
        if lower.contains("[error]") || lower.contains("failed") {
            Some(Self::Error)
        } else if lower.contains("[status]") {
            Some(Self::Status)
        } else if lower.contains("[system]") {
            Some(Self::System)
        } else if lower.contains("[model]") {
            Some(Self::Model)
        } else {
            None
        }
    }
}
