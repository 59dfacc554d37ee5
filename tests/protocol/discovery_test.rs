//! Tests for model catalog and status discovery against fake app servers.

use std::time::Duration;

use ideaforge::agent::{AgentCommand, CancellationController, PlatformCapabilities};
use ideaforge::protocol::{
    fetch_model_catalog, read_model_status, DiscoverySettings, ProtocolError,
};

use super::fake_server;

const CATALOG_ARM: &str = r#"    *'"model/list"'*)
      echo 'warning: config not found, using defaults'
      echo '{"id":"model-list-request","result":{"data":[{"id":"gpt-5.3-codex","supportedReasoningEfforts":[{"reasoningEffort":"low"},{"reasoningEffort":"high"}],"defaultReasoningEffort":"high","isDefault":true},{"model":"o4-mini","supportedReasoningEfforts":["medium"]},{"id":"gpt-5.3-codex"}]}}' ;;"#;

const STATUS_ARMS: &str = r#"    *'"thread/start"'*)
      echo '{"id":"thread-start-status","result":{"thread":{"id":"t1"},"model":"gpt-5.3-codex"}}' ;;
    *'"account/rateLimits/read"'*)
      echo '{"method":"account/rateLimits/updated","params":{"rateLimits":{"primary":{"usedPercent":25,"resetsAt":1767225600},"secondary":{"usedPercent":60.5}}}}'
      echo '{"id":"rate-limits-read","result":{}}' ;;"#;

fn settings(command: AgentCommand, timeout: Duration) -> DiscoverySettings {
    let mut settings = DiscoverySettings::new(command, timeout);
    settings.controller =
        CancellationController::new(PlatformCapabilities::current(), Duration::from_millis(500));
    settings
}

#[tokio::test]
async fn catalog_lists_models_once_each() {
    let catalog = fetch_model_catalog(&settings(fake_server(CATALOG_ARM), Duration::from_secs(5)))
        .await
        .unwrap();

    let models: Vec<&str> = catalog.iter().map(|entry| entry.model.as_str()).collect();
    assert_eq!(models, ["gpt-5.3-codex", "o4-mini"]);
    assert_eq!(catalog[0].efforts, ["low", "high"]);
    assert_eq!(catalog[0].default_effort, "high");
    assert!(catalog[0].is_default);
    assert_eq!(catalog[1].efforts, ["medium"]);
    assert!(!catalog[1].is_default);
}

#[tokio::test]
async fn empty_catalog_is_an_error_with_output() {
    let server = fake_server(
        r#"    *'"model/list"'*) echo '{"id":"model-list-request","result":{"data":[]}}' ;;"#,
    );
    let err = fetch_model_catalog(&settings(server, Duration::from_secs(5)))
        .await
        .unwrap_err();

    assert!(matches!(err.source, ProtocolError::EmptyResult { what: "model catalog" }));
    assert_eq!(
        err.recent_output.last().map(String::as_str),
        Some(r#"{"id":"model-list-request","result":{"data":[]}}"#)
    );
}

#[tokio::test]
async fn status_reads_model_and_pushed_limits() {
    let status = read_model_status(&settings(fake_server(STATUS_ARMS), Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(status.current_model.as_deref(), Some("gpt-5.3-codex"));
    let primary = status.rate_limits.window("primary").unwrap();
    assert_eq!(primary.percent_left(), Some(75));
    assert_eq!(primary.resets_at, Some(1_767_225_600));

    let lines = status.compact_lines();
    assert_eq!(lines[0], "Current Model Used: gpt-5.3-codex");
    assert!(lines[1].starts_with("5h Usage Left: 75% (Resets: "));
    assert_eq!(lines[2], "Weekly Usage Left: 40% (Resets: Unknown)");
}

#[tokio::test]
async fn status_without_limits_is_an_error() {
    let server = fake_server(
        r#"    *'"thread/start"'*) echo '{"id":"thread-start-status","result":{}}' ;;
    *'"account/rateLimits/read"'*) echo '{"id":"rate-limits-read","result":{}}' ;;"#,
    );
    let err = read_model_status(&settings(server, Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert!(matches!(err.source, ProtocolError::EmptyResult { what: "rate limits" }));
}

#[tokio::test]
async fn silent_server_times_out() {
    let server = AgentCommand::new("sh").arg("-c").arg("cat > /dev/null");
    let err = fetch_model_catalog(&settings(server, Duration::from_millis(100)))
        .await
        .unwrap_err();

    assert!(matches!(err.source, ProtocolError::Timeout { .. }));
    assert!(err.recent_output.is_empty());
}

#[tokio::test]
async fn missing_server_is_a_spawn_error() {
    let server = AgentCommand::new("ideaforge-no-such-app-server");
    let err = fetch_model_catalog(&settings(server, Duration::from_secs(1)))
        .await
        .unwrap_err();
    assert!(matches!(err.source, ProtocolError::Process(_)));
}

#[tokio::test]
async fn sessions_run_concurrently() {
    let catalog_settings = settings(fake_server(CATALOG_ARM), Duration::from_secs(5));
    let status_settings = settings(fake_server(STATUS_ARMS), Duration::from_secs(5));

    let (catalog, status) = tokio::join!(
        fetch_model_catalog(&catalog_settings),
        read_model_status(&status_settings)
    );
    assert_eq!(catalog.unwrap().len(), 2);
    assert_eq!(status.unwrap().current_model.as_deref(), Some("gpt-5.3-codex"));
}
