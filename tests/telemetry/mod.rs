//! Telemetry extraction tests.

mod context_test;

/// Verify the public telemetry items are exported from the library.
#[test]
fn test_all_telemetry_items_exported() {
    use ideaforge::telemetry::{
        extract_context_left_percent, extract_rate_limits, format_log_line, format_timestamp,
        GenerationPhase, LogTag, RateLimitSnapshot, RateLimitWindow, MAX_SEARCH_DEPTH,
        RATE_LIMITS_UPDATED_METHOD, UNKNOWN,
    };

    assert!(MAX_SEARCH_DEPTH > 0);
    assert_eq!(UNKNOWN, "Unknown");
    assert_eq!(RATE_LIMITS_UPDATED_METHOD, "account/rateLimits/updated");
    assert_eq!(extract_context_left_percent(""), None);
    assert_eq!(extract_rate_limits(&serde_json::Value::Null), None);
    assert_eq!(format_log_line(""), None);
    assert_eq!(GenerationPhase::Error.label(), "error encountered");
    assert_eq!(LogTag::classify("plain"), None);
    assert!(RateLimitSnapshot::default().is_empty());
    assert_eq!(RateLimitWindow::default().percent_left(), None);
    let _ = format_timestamp(&chrono::Utc::now());
}
