//! Line-delimited JSON request/response client over an agent process.
//!
//! Requests carry a string `id`; the matching response echoes it. Anything
//! else on the output stream (notifications, log noise, responses to older
//! requests) is collected but never satisfies a wait.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::time::Instant;

use crate::agent::{
    AgentCommand, CancellationController, LineStreamReader, ProcessError, ProcessHandle,
    Received, StopOutcome,
};

/// Upper bound on a single queue wait inside a request.
pub const POLL_SLICE: Duration = Duration::from_millis(500);
/// Lower bound on a single queue wait inside a request.
pub const MIN_POLL_SLICE: Duration = Duration::from_millis(10);
/// Number of raw output lines kept for diagnostics.
pub const RECENT_OUTPUT_LINES: usize = 20;

/// Error type for protocol exchanges.
#[derive(thiserror::Error, Debug)]
pub enum ProtocolError {
    /// Spawning, writing to, or stopping the process failed.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// No correlated response arrived before the deadline.
    #[error("Timed out after {waited:?} waiting for {method} response (id {id})")]
    Timeout {
        method: String,
        id: String,
        waited: Duration,
    },
    /// A well-formed response carried nothing usable.
    #[error("Agent returned no usable {what}")]
    EmptyResult { what: &'static str },
    /// The process output ended before the response arrived.
    #[error("Agent output closed before a response arrived (exit code {exit_code:?})")]
    OutputClosed { exit_code: Option<i32> },
    /// The request id was already used in this session.
    #[error("Request id already used in this session: {id}")]
    DuplicateId { id: String },
}

/// Client identity sent in the `initialize` handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub name: String,
    pub title: String,
    pub version: String,
}

impl ClientIdentity {
    /// Identity with the given name, a title-cased title, and this crate's version.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title_case(name),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self::named(env!("CARGO_PKG_NAME"))
    }
}

fn title_case(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of one request: the matched response plus every JSON object seen
/// while waiting for it (the response included, last).
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub response: Map<String, Value>,
    pub collected: Vec<Map<String, Value>>,
}

/// One protocol session bound to one agent process.
///
/// Only one request may be in flight at a time; `&mut self` enforces that.
#[derive(Debug)]
pub struct ProtocolClient {
    handle: ProcessHandle,
    reader: LineStreamReader,
    pending: HashSet<String>,
    answered: HashSet<String>,
    recent: VecDeque<String>,
}

impl ProtocolClient {
    /// Spawn `command` and attach a client to its output.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Process` if the process cannot be started.
    pub fn spawn(command: &AgentCommand) -> Result<Self, ProtocolError> {
        let handle = ProcessHandle::start(command).map_err(ProcessError::from)?;
        Self::attach(handle)
    }

    /// Attach to an already started process whose output has not been taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the process output was already taken.
    pub fn attach(mut handle: ProcessHandle) -> Result<Self, ProtocolError> {
        let reader = handle.take_reader().ok_or_else(|| {
            ProcessError::Io(std::io::Error::other("process output already taken"))
        })?;
        Ok(Self {
            handle,
            reader,
            pending: HashSet::new(),
            answered: HashSet::new(),
            recent: VecDeque::with_capacity(RECENT_OUTPUT_LINES),
        })
    }

    /// The underlying process.
    #[must_use]
    pub fn handle(&self) -> &ProcessHandle {
        &self.handle
    }

    /// Send the `initialize` request followed by the `initialized`
    /// notification. The initialize response is not awaited.
    ///
    /// # Errors
    ///
    /// Returns an error if either line cannot be written.
    pub async fn handshake(&mut self, identity: &ClientIdentity) -> Result<(), ProtocolError> {
        let id = "initialize-request";
        self.claim_id(id)?;
        let params = json!({
            "clientInfo": identity,
            "capabilities": {
                "experimentalApi": true,
                "optOutNotificationMethods": null,
            },
        });
        self.send_request(id, "initialize", &params).await?;
        self.notify("initialized", None).await
    }

    /// Send a notification; no response is expected.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be written.
    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), ProtocolError> {
        let mut message = Map::new();
        message.insert("method".to_string(), Value::from(method));
        if let Some(params) = params {
            message.insert("params".to_string(), params);
        }
        tracing::debug!(method, "Sending notification");
        self.handle.write_line(&message).await?;
        Ok(())
    }

    /// Send a request with a generated id and wait for its response.
    ///
    /// # Errors
    ///
    /// See [`ProtocolClient::request_with_id`].
    pub async fn request(
        &mut self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Exchange, ProtocolError> {
        let id = format!("{method}-{}", uuid::Uuid::new_v4());
        self.request_with_id(&id, method, params, timeout).await
    }

    /// Send a request with a caller-chosen id and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateId` if `id` was used before in this session,
    /// `Timeout` if no response arrives within `timeout`, `OutputClosed` if
    /// the process output ends first, or a process error if the write fails.
    pub async fn request_with_id(
        &mut self,
        id: &str,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Exchange, ProtocolError> {
        self.claim_id(id)?;
        self.send_request(id, method, &params).await?;
        self.wait_for(id, method, timeout).await
    }

    /// Last raw output lines, oldest first.
    #[must_use]
    pub fn recent_output(&self) -> Vec<String> {
        self.recent.iter().cloned().collect()
    }

    /// Stop the process through `controller` and drop the session.
    ///
    /// # Errors
    ///
    /// Returns an error if stopping the process fails.
    pub async fn shutdown(
        mut self,
        controller: &CancellationController,
    ) -> Result<StopOutcome, ProcessError> {
        controller.stop(&mut self.handle).await
    }

    fn claim_id(&mut self, id: &str) -> Result<(), ProtocolError> {
        if self.answered.contains(id) || !self.pending.insert(id.to_string()) {
            return Err(ProtocolError::DuplicateId { id: id.to_string() });
        }
        Ok(())
    }

    async fn send_request(&mut self, id: &str, method: &str, params: &Value) -> Result<(), ProtocolError> {
        let message = json!({
            "method": method,
            "id": id,
            "params": params,
        });
        tracing::debug!(method, id, "Sending request");
        self.handle.write_line(&message).await?;
        Ok(())
    }

    async fn wait_for(
        &mut self,
        id: &str,
        method: &str,
        timeout: Duration,
    ) -> Result<Exchange, ProtocolError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut collected = Vec::new();

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(method, id, ?timeout, "Request timed out");
                return Err(ProtocolError::Timeout {
                    method: method.to_string(),
                    id: id.to_string(),
                    waited: now - started,
                });
            }
            let slice = (deadline - now).clamp(MIN_POLL_SLICE, POLL_SLICE);

            match self.reader.recv_timeout(slice).await {
                Received::Line(line) => {
                    let Some(payload) = self.accept_line(line) else {
                        continue;
                    };
                    if payload.get("id").and_then(Value::as_str) != Some(id) {
                        collected.push(payload);
                        continue;
                    }
                    self.pending.remove(id);
                    self.answered.insert(id.to_string());
                    tracing::debug!(method, id, elapsed = ?started.elapsed(), "Received response");
                    collected.push(payload.clone());
                    return Ok(Exchange {
                        response: payload,
                        collected,
                    });
                }
                Received::Idle => {
                    // A dead process is noticed here; the reader then closes
                    // once its pipes drain.
                    self.handle.poll();
                }
                Received::Closed => {
                    let exit_code = self.handle.poll();
                    tracing::warn!(method, id, ?exit_code, "Agent output closed while waiting");
                    return Err(ProtocolError::OutputClosed { exit_code });
                }
            }
        }
    }

    /// Record a raw line and parse it as a JSON object, if it is one.
    fn accept_line(&mut self, line: String) -> Option<Map<String, Value>> {
        if line.trim().is_empty() {
            return None;
        }
        tracing::trace!(%line, "Agent output");
        let parsed = serde_json::from_str::<Value>(&line);

        if self.recent.len() == RECENT_OUTPUT_LINES {
            self.recent.pop_front();
        }
        self.recent.push_back(line);

        match parsed {
            Ok(Value::Object(payload)) => {
                if let Some(late) = payload.get("id").and_then(Value::as_str) {
                    if self.answered.contains(late) {
                        tracing::debug!(id = late, "Ignoring repeated response");
                        return None;
                    }
                }
                Some(payload)
            }
            _ => None,
        }
    }
}
