//! Tests for the posts, models, and status commands.

use std::fs;

use ideaforge::posts::NO_POSTS_MESSAGE;
use serde_json::Value;

use super::{fixture, run};

const FAKE_APP_SERVER: &str = r#"while IFS= read -r line; do
  case "$line" in
    *'"model/list"'*)
      echo '{"id":"model-list-request","result":{"data":[{"id":"gpt-5.3-codex","supportedReasoningEfforts":[{"reasoningEffort":"medium"},{"reasoningEffort":"high"}],"isDefault":true},{"id":"o4-mini"}]}}' ;;
    *'"thread/start"'*)
      echo '{"id":"thread-start-status","result":{"model":"gpt-5.3-codex"}}' ;;
    *'"account/rateLimits/read"'*)
      echo '{"id":"rate-limits-read","result":{"rateLimits":{"primary":{"usedPercent":12},"secondary":{"usedPercent":40}}}}' ;;
  esac
done
"#;

/// A workspace whose `app-server` file is the fake server, run through `sh`.
fn fake_codex_workspace() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("app-server"), FAKE_APP_SERVER).unwrap();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        "[agent]\ncodex_program = \"sh\"\n\n[discovery]\ncatalog_timeout_secs = 5.0\nstatus_timeout_secs = 5.0\ngrace_period_ms = 500\n",
    )
    .unwrap();
    (dir, config)
}

fn empty_config() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "").unwrap();
    (dir, config)
}

#[test]
fn posts_json_lists_every_post() {
    let (_dir, config) = empty_config();
    let file = fixture("march_ideas.md");
    let output = run(&["posts", file.to_str().unwrap(), "--json"], &config);

    assert!(output.status.success());
    let posts: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(posts.as_array().map(Vec::len), Some(2));
}

#[test]
fn posts_single_view_shows_fields() {
    let (_dir, config) = empty_config();
    let file = fixture("march_ideas.md");
    let output = run(&["posts", file.to_str().unwrap(), "--post", "1"], &config);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Graphic Title"));
    assert!(stdout.contains("Honeysuckle"));
}

#[test]
fn posts_without_headers_reports_none_found() {
    let (dir, config) = empty_config();
    let file = dir.path().join("notes.md");
    fs::write(&file, "Just some notes.\nNothing structured here.\n").unwrap();
    let output = run(&["posts", file.to_str().unwrap()], &config);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(NO_POSTS_MESSAGE));
}

#[test]
fn posts_missing_file_fails() {
    let (dir, config) = empty_config();
    let file = dir.path().join("absent.md");
    let output = run(&["posts", file.to_str().unwrap()], &config);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}

#[test]
fn invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[agent\n").unwrap();
    let file = fixture("march_ideas.md");
    let output = run(&["posts", file.to_str().unwrap()], &config);

    assert!(!output.status.success());
}

#[test]
fn missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("absent.toml");
    let file = fixture("march_ideas.md");
    let output = run(&["posts", file.to_str().unwrap()], &config);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent.toml"), "stderr: {stderr}");
}

#[cfg(unix)]
#[test]
fn models_lists_catalog_from_app_server() {
    let (dir, config) = fake_codex_workspace();
    let workdir = dir.path().to_str().unwrap();
    let output = run(&["--workdir", workdir, "models"], &config);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gpt-5.3-codex"));
    assert!(stdout.contains("o4-mini"));
    assert!(stdout.contains("medium (default)"));
}

#[cfg(unix)]
#[test]
fn status_shows_usage_left() {
    let (dir, config) = fake_codex_workspace();
    let workdir = dir.path().to_str().unwrap();
    let output = run(&["--workdir", workdir, "status"], &config);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Current Model Used: gpt-5.3-codex"));
    assert!(stdout.contains("5h Usage Left: 88% (Resets: Unknown)"));
    assert!(stdout.contains("Weekly Usage Left: 60% (Resets: Unknown)"));
}

#[test]
fn missing_app_server_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[agent]\ncodex_program = \"ideaforge-no-such-codex\"\n").unwrap();
    let output = run(&["models"], &config);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load models"));
}
