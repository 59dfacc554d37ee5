//! Tests for request/response correlation over a live process.

use std::time::Duration;

use ideaforge::agent::{
    AgentCommand, CancellationController, PlatformCapabilities, StopOutcome,
};
use ideaforge::protocol::{ClientIdentity, ProtocolClient, ProtocolError};
use serde_json::{json, Value};

use super::fake_server;
use crate::agent::pid_alive;

fn quick_controller() -> CancellationController {
    CancellationController::new(PlatformCapabilities::current(), Duration::from_millis(500))
}

#[tokio::test]
async fn response_is_matched_by_id_among_noise() {
    let server = fake_server(
        r#"    *'"echo"'*)
      echo 'booting agent...'
      echo '[1, 2]'
      echo '{"method":"thread/started","params":{}}'
      echo '{"id":"other","result":{}}'
      echo '{"id":"req-1","result":{"ok":true}}' ;;"#,
    );
    let mut client = ProtocolClient::spawn(&server).unwrap();

    let exchange = client
        .request_with_id("req-1", "echo", json!({}), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(exchange.response["result"]["ok"], Value::Bool(true));
    assert_eq!(exchange.collected.len(), 3);
    assert_eq!(exchange.collected[0]["method"], "thread/started");
    assert_eq!(exchange.collected[2], exchange.response);
    assert_eq!(client.recent_output()[0], "booting agent...");

    client.shutdown(&quick_controller()).await.unwrap();
}

#[tokio::test]
async fn silent_process_times_out_and_is_terminated() {
    let mut client = ProtocolClient::spawn(&AgentCommand::new("sleep").arg("30")).unwrap();
    let pid = client.handle().pid().unwrap();

    let err = client
        .request("model/list", json!({}), Duration::from_secs_f64(0.01))
        .await
        .unwrap_err();
    match err {
        ProtocolError::Timeout { method, waited, .. } => {
            assert_eq!(method, "model/list");
            assert!(waited < Duration::from_secs(1));
        }
        other => panic!("expected timeout, got {other:?}"),
    }

    let outcome = client.shutdown(&quick_controller()).await.unwrap();
    assert!(!matches!(outcome, StopOutcome::AlreadyExited { .. }));
    assert!(!pid_alive(pid));
}

#[tokio::test]
async fn exited_process_closes_the_wait() {
    let server = AgentCommand::new("sh")
        .arg("-c")
        .arg("read line; exit 3");
    let mut client = ProtocolClient::spawn(&server).unwrap();

    let err = client
        .request_with_id("r", "thread/start", json!({}), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::OutputClosed { .. }));
}

#[tokio::test]
async fn ids_cannot_be_reused() {
    // cat echoes each request back, which makes it its own response.
    let mut client = ProtocolClient::spawn(&AgentCommand::new("cat")).unwrap();

    client
        .request_with_id("same", "ping", json!({}), Duration::from_secs(5))
        .await
        .unwrap();
    let err = client
        .request_with_id("same", "ping", json!({}), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::DuplicateId { id } if id == "same"));

    client.shutdown(&quick_controller()).await.unwrap();
}

#[tokio::test]
async fn late_response_does_not_satisfy_next_request() {
    let server = fake_server(
        r#"    *'"slow"'*) sleep 0.3; echo '{"id":"slow-1","result":"late"}' ;;
    *'"fast"'*) echo '{"id":"fast-1","result":"now"}' ;;"#,
    );
    let mut client = ProtocolClient::spawn(&server).unwrap();

    let err = client
        .request_with_id("slow-1", "slow", json!({}), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout { .. }));

    let exchange = client
        .request_with_id("fast-1", "fast", json!({}), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(exchange.response["result"], "now");
    assert_eq!(exchange.collected.len(), 2);
    assert_eq!(exchange.collected[0]["result"], "late");

    client.shutdown(&quick_controller()).await.unwrap();
}

#[tokio::test]
async fn handshake_sends_identity_then_initialized() {
    let mut client = ProtocolClient::spawn(&AgentCommand::new("cat")).unwrap();
    let identity = ClientIdentity::named("post-picker");

    client.handshake(&identity).await.unwrap();
    let exchange = client
        .request_with_id("echo-check", "echo-check", json!({}), Duration::from_secs(5))
        .await
        .unwrap();

    let initialize = &exchange.collected[0];
    assert_eq!(initialize["method"], "initialize");
    assert_eq!(initialize["id"], "initialize-request");
    assert_eq!(initialize["params"]["clientInfo"]["name"], "post-picker");
    assert_eq!(initialize["params"]["clientInfo"]["title"], "Post Picker");
    assert_eq!(initialize["params"]["capabilities"]["experimentalApi"], true);
    assert!(initialize["params"]["capabilities"]["optOutNotificationMethods"].is_null());
    assert_eq!(
        Value::Object(exchange.collected[1].clone()),
        json!({"method": "initialized"})
    );

    client.shutdown(&quick_controller()).await.unwrap();
}
