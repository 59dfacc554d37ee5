//! Tests for context-left detection on realistic agent lines.

use ideaforge::telemetry::extract_context_left_percent;

#[test]
fn documented_forms() {
    assert_eq!(extract_context_left_percent(r#"{"contextLeft": "42%"}"#), Some(42));
    assert_eq!(extract_context_left_percent("Context: 87%"), Some(87));
    assert_eq!(extract_context_left_percent("no signal here"), None);
}

#[test]
fn token_count_event_from_exec_stream() {
    let line = r#"{"type":"turn.completed","usage":{"input_tokens":64000,"cached_input_tokens":0,"output_tokens":900,"max_context_tokens":256000}}"#;
    assert_eq!(extract_context_left_percent(line), Some(75));
}

#[test]
fn direct_key_wins_over_token_counts() {
    let line = r#"{"max_context_tokens":100,"prompt_tokens":90,"context_left_percent":55}"#;
    assert_eq!(extract_context_left_percent(line), Some(55));
}

#[test]
fn first_match_in_key_order() {
    let line = r#"{"a":{"contextLeft":10},"b":{"contextLeft":20}}"#;
    assert_eq!(extract_context_left_percent(line), Some(10));
}

#[test]
fn free_text_inside_log_noise() {
    assert_eq!(
        extract_context_left_percent("2026-03-01T10:00:00 [status] 64% context left"),
        Some(64)
    );
    assert_eq!(extract_context_left_percent("CONTEXT = 0%"), Some(0));
    assert_eq!(extract_context_left_percent("context: 1000%"), None);
}

#[test]
fn invalid_json_is_treated_as_text() {
    assert_eq!(extract_context_left_percent(r#"{"contextLeft": 5"#), None);
    assert_eq!(extract_context_left_percent(r#"{"oops" context: 30%"#), Some(30));
}
