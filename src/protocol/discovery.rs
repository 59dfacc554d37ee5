//! Short-lived discovery sessions against the agent's app server.
//!
//! Each call spawns its own process, performs the handshake and one
//! exchange, and always stops the process before returning. Sessions share
//! nothing, so several may run at once.

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::catalog::{parse_model_catalog, ModelCatalogEntry};
use super::client::{ClientIdentity, ProtocolClient, ProtocolError};
use crate::agent::{AgentCommand, CancellationController};
use crate::telemetry::{rate_limits_in, RateLimitSnapshot, UNKNOWN};

const MODEL_LIST_ID: &str = "model-list-request";
const THREAD_START_ID: &str = "thread-start-status";
const RATE_LIMITS_ID: &str = "rate-limits-read";

/// A failed discovery session, with the output it produced.
#[derive(thiserror::Error, Debug)]
#[error("{source}")]
pub struct DiscoveryError {
    pub source: ProtocolError,
    /// Last raw output lines of the session, oldest first.
    pub recent_output: Vec<String>,
}

/// Everything a discovery session needs.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// App-server command to spawn.
    pub command: AgentCommand,
    /// Deadline for each individual request.
    pub timeout: Duration,
    /// Identity sent in the handshake.
    pub identity: ClientIdentity,
    /// How the process is stopped afterwards.
    pub controller: CancellationController,
}

impl DiscoverySettings {
    /// Settings with default identity and cancellation.
    #[must_use]
    pub fn new(command: AgentCommand, timeout: Duration) -> Self {
        Self {
            command,
            timeout,
            identity: ClientIdentity::default(),
            controller: CancellationController::default(),
        }
    }
}

/// Current model and rate-limit windows of the signed-in account.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelStatus {
    pub current_model: Option<String>,
    pub rate_limits: RateLimitSnapshot,
}

impl ModelStatus {
    /// Compact status lines: current model, 5 hour window, weekly window.
    #[must_use]
    pub fn compact_lines(&self) -> Vec<String> {
        let model = self
            .current_model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(UNKNOWN);

        let mut lines = vec![format!("Current Model Used: {model}")];
        for (label, window) in [
            ("5h Usage Left", RateLimitSnapshot::PRIMARY),
            ("Weekly Usage Left", RateLimitSnapshot::SECONDARY),
        ] {
            let (left, reset) = self.rate_limits.window(window).map_or_else(
                || (UNKNOWN.to_string(), UNKNOWN.to_string()),
                |window| (window.format_percent_left(), window.format_reset()),
            );
            lines.push(format!("{label}: {left} (Resets: {reset})"));
        }
        lines
    }
}

/// List the models the agent offers.
///
/// # Errors
///
/// Returns `DiscoveryError` if the session fails or the catalog is empty.
pub async fn fetch_model_catalog(
    settings: &DiscoverySettings,
) -> Result<Vec<ModelCatalogEntry>, DiscoveryError> {
    let mut client = open_session(settings)?;
    let outcome = catalog_exchange(&mut client, settings).await;
    close_session(client, settings, outcome).await
}

/// Read the current model and account rate limits.
///
/// # Errors
///
/// Returns `DiscoveryError` if the session fails or no rate limits are
/// reported.
pub async fn read_model_status(settings: &DiscoverySettings) -> Result<ModelStatus, DiscoveryError> {
    let mut client = open_session(settings)?;
    let outcome = status_exchange(&mut client, settings).await;
    close_session(client, settings, outcome).await
}

async fn catalog_exchange(
    client: &mut ProtocolClient,
    settings: &DiscoverySettings,
) -> Result<Vec<ModelCatalogEntry>, ProtocolError> {
    client.handshake(&settings.identity).await?;
    let exchange = client
        .request_with_id(
            MODEL_LIST_ID,
            "model/list",
            json!({"includeHidden": false}),
            settings.timeout,
        )
        .await?;

    let catalog = parse_model_catalog(&exchange.response);
    if catalog.is_empty() {
        return Err(ProtocolError::EmptyResult {
            what: "model catalog",
        });
    }
    tracing::info!(models = catalog.len(), "Loaded model catalog");
    Ok(catalog)
}

async fn status_exchange(
    client: &mut ProtocolClient,
    settings: &DiscoverySettings,
) -> Result<ModelStatus, ProtocolError> {
    client.handshake(&settings.identity).await?;

    let thread = client
        .request_with_id(THREAD_START_ID, "thread/start", json!({}), settings.timeout)
        .await?;
    let current_model = thread_model(&thread.response);

    // Limits may arrive as a push notification ahead of the response.
    let limits = client
        .request_with_id(
            RATE_LIMITS_ID,
            "account/rateLimits/read",
            json!({}),
            settings.timeout,
        )
        .await?;
    let rate_limits = limits
        .collected
        .iter()
        .find_map(rate_limits_in)
        .map(RateLimitSnapshot::from_map)
        .ok_or(ProtocolError::EmptyResult { what: "rate limits" })?;

    Ok(ModelStatus {
        current_model,
        rate_limits,
    })
}

fn thread_model(response: &Map<String, Value>) -> Option<String> {
    let model = response.get("result")?.get("model")?.as_str()?.trim();
    (!model.is_empty()).then(|| model.to_string())
}

fn open_session(settings: &DiscoverySettings) -> Result<ProtocolClient, DiscoveryError> {
    tracing::debug!(command = %settings.command, "Starting discovery session");
    ProtocolClient::spawn(&settings.command).map_err(|source| DiscoveryError {
        source,
        recent_output: Vec::new(),
    })
}

/// Stop the session process, then report the exchange outcome.
async fn close_session<T>(
    client: ProtocolClient,
    settings: &DiscoverySettings,
    outcome: Result<T, ProtocolError>,
) -> Result<T, DiscoveryError> {
    let recent_output = client.recent_output();

    match client.shutdown(&settings.controller).await {
        Ok(stopped) => tracing::debug!(?stopped, "Discovery session stopped"),
        Err(err) => tracing::warn!(error = %err, "Failed to stop discovery session"),
    }

    outcome.map_err(|source| {
        tracing::warn!(error = %source, "Discovery session failed");
        DiscoveryError {
            source,
            recent_output,
        }
    })
}
