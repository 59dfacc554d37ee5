//! Account rate-limit windows reported by the agent.

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};

/// Notification method that pushes updated rate limits.
pub const RATE_LIMITS_UPDATED_METHOD: &str = "account/rateLimits/updated";

/// Shown for any value that is missing or unusable.
pub const UNKNOWN: &str = "Unknown";

/// Find the rate-limit object in a response or push notification.
///
/// Recognizes `{"result": {"rateLimits": {...}}}` and
/// `{"method": "account/rateLimits/updated", "params": {"rateLimits": {...}}}`.
#[must_use]
pub fn extract_rate_limits(payload: &Value) -> Option<&Map<String, Value>> {
    rate_limits_in(payload.as_object()?)
}

/// [`extract_rate_limits`] over an already decoded JSON object.
#[must_use]
pub fn rate_limits_in(payload: &Map<String, Value>) -> Option<&Map<String, Value>> {
    if let Some(limits) = payload
        .get("result")
        .and_then(|result| result.get("rateLimits"))
        .and_then(Value::as_object)
    {
        return Some(limits);
    }

    if payload.get("method").and_then(Value::as_str) == Some(RATE_LIMITS_UPDATED_METHOD) {
        return payload
            .get("params")
            .and_then(|params| params.get("rateLimits"))
            .and_then(Value::as_object);
    }

    None
}

/// One rate-limit window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitWindow {
    /// Percent of the window already used.
    pub used_percent: Option<f64>,
    /// Unix timestamp (seconds) at which the window resets.
    pub resets_at: Option<i64>,
}

impl RateLimitWindow {
    /// Read a window object; non-objects yield `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            used_percent: object.get("usedPercent").and_then(Value::as_f64),
            resets_at: object
                .get("resetsAt")
                .filter(|value| value.is_i64() || value.is_u64())
                .and_then(Value::as_i64),
        })
    }

    /// Percent still available: `100 - round(used)`, clamped to 0..=100.
    #[must_use]
    pub fn percent_left(&self) -> Option<u8> {
        let used = self.used_percent?;
        let left = (100.0 - used.round_ties_even()).clamp(0.0, 100.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(left as u8)
    }

    /// Reset time in local time, e.g. `March 4, 2026 - 3:05 PM`.
    #[must_use]
    pub fn resets_at_local(&self) -> Option<DateTime<Local>> {
        let secs = self.resets_at?;
        DateTime::from_timestamp(secs, 0).map(|utc| utc.with_timezone(&Local))
    }

    /// `"NN%"` or [`UNKNOWN`].
    #[must_use]
    pub fn format_percent_left(&self) -> String {
        self.percent_left()
            .map_or_else(|| UNKNOWN.to_string(), |left| format!("{left}%"))
    }

    /// Formatted reset time or [`UNKNOWN`].
    #[must_use]
    pub fn format_reset(&self) -> String {
        self.resets_at_local()
            .map_or_else(|| UNKNOWN.to_string(), |at| format_timestamp(&at))
    }
}

/// Format a timestamp as `Month D, YYYY - H:MM AM`.
#[must_use]
pub fn format_timestamp<Tz: chrono::TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%B %-d, %Y - %-I:%M %p").to_string()
}

/// All named windows of a rate-limit report, in payload order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RateLimitSnapshot {
    windows: Vec<(String, RateLimitWindow)>,
}

impl RateLimitSnapshot {
    /// Primary (short, 5 hour) window name.
    pub const PRIMARY: &'static str = "primary";
    /// Secondary (weekly) window name.
    pub const SECONDARY: &'static str = "secondary";

    /// Collect every object-valued entry of a rate-limit map.
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let windows = map
            .iter()
            .filter_map(|(name, value)| {
                RateLimitWindow::from_value(value).map(|window| (name.clone(), window))
            })
            .collect();
        Self { windows }
    }

    /// Window by name.
    #[must_use]
    pub fn window(&self, name: &str) -> Option<&RateLimitWindow> {
        self.windows
            .iter()
            .find(|(window, _)| window == name)
            .map(|(_, window)| window)
    }

    /// All windows.
    pub fn windows(&self) -> impl Iterator<Item = (&str, &RateLimitWindow)> {
        self.windows.iter().map(|(name, window)| (name.as_str(), window))
    }

    /// True if no window was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
