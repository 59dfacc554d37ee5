//! Model catalog parsing.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::agent::DEFAULT_REASONING_EFFORT;

/// One model offered by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCatalogEntry {
    /// Model identifier, unique within a catalog.
    pub model: String,
    /// Supported reasoning efforts in advertised order; never empty.
    pub efforts: Vec<String>,
    /// Default effort; always a member of `efforts`.
    pub default_effort: String,
    /// Whether the agent marks this model as its default.
    pub is_default: bool,
}

impl ModelCatalogEntry {
    /// Parse one raw entry; entries without a model identifier are dropped.
    #[must_use]
    pub fn from_value(raw: &Value) -> Option<Self> {
        let raw = raw.as_object()?;
        let model = raw
            .get("id")
            .or_else(|| raw.get("model"))?
            .as_str()?
            .trim();
        if model.is_empty() {
            return None;
        }

        let mut efforts = supported_efforts(raw);
        if efforts.is_empty() {
            efforts.push(DEFAULT_REASONING_EFFORT.to_string());
        }

        let default_effort = raw
            .get("defaultReasoningEffort")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|effort| efforts.iter().any(|known| known == effort))
            .map_or_else(|| efforts[0].clone(), str::to_string);

        Some(Self {
            model: model.to_string(),
            efforts,
            default_effort,
            is_default: raw.get("isDefault").is_some_and(is_truthy),
        })
    }
}

/// Parse a `model/list` response into catalog entries.
///
/// Entries are read from `result.data`, or `result.items` when `data` is not
/// a list. A repeated model keeps its first entry.
#[must_use]
pub fn parse_model_catalog(response: &Map<String, Value>) -> Vec<ModelCatalogEntry> {
    let Some(result) = response.get("result").and_then(Value::as_object) else {
        return Vec::new();
    };
    let Some(raw_models) = result
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| result.get("items").and_then(Value::as_array))
    else {
        return Vec::new();
    };

    let mut catalog: Vec<ModelCatalogEntry> = Vec::new();
    for entry in raw_models.iter().filter_map(ModelCatalogEntry::from_value) {
        if catalog.iter().any(|known| known.model == entry.model) {
            tracing::debug!(model = %entry.model, "Skipping repeated catalog entry");
            continue;
        }
        catalog.push(entry);
    }
    catalog
}

fn supported_efforts(raw: &Map<String, Value>) -> Vec<String> {
    let mut efforts: Vec<String> = Vec::new();
    let Some(list) = raw.get("supportedReasoningEfforts").and_then(Value::as_array) else {
        return efforts;
    };
    for effort in list
        .iter()
        .filter_map(|item| item.get("reasoningEffort")?.as_str())
        .map(str::trim)
    {
        if !effort.is_empty() && !efforts.iter().any(|known| known == effort) {
            efforts.push(effort.to_string());
        }
    }
    efforts
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
