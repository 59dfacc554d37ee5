//! Long-running generation sessions.
//!
//! A generation session runs one agent exec process with merged output and
//! turns its output into a stream of [`GenerationEvent`]s: log lines,
//! context-left updates, turn phases, and a final outcome.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::agent::{
    AgentCommand, CancellationController, LineStreamReader, ProcessError, ProcessHandle,
    ProcessState, PromptDelivery, Received,
};
use crate::telemetry::{extract_context_left_percent, format_log_line, GenerationPhase};

/// How long one event wait blocks before the process is polled again.
pub const EVENT_POLL: Duration = Duration::from_millis(500);

/// One output line of the generation process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// The line as emitted, terminator stripped.
    pub raw: String,
    /// Display form, `None` when there is nothing to show.
    pub display: Option<String>,
}

/// How a generation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GenerationOutcome {
    Completed,
    Failed { exit_code: i32 },
    Stopped { exit_code: i32 },
}

/// Something the caller should display or react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GenerationEvent {
    Log(LogLine),
    /// Context-left percentage changed.
    ContextLeft(u8),
    Phase(GenerationPhase),
    /// Always the last event.
    Finished(GenerationOutcome),
}

/// A running generation process.
#[derive(Debug)]
pub struct GenerationSession {
    handle: ProcessHandle,
    reader: LineStreamReader,
    controller: CancellationController,
    stop: CancellationToken,
    stop_requested: bool,
    context_left: Option<u8>,
    pending: VecDeque<GenerationEvent>,
    finished: bool,
}

impl GenerationSession {
    /// Spawn `command` and deliver `prompt` to it.
    ///
    /// With [`PromptDelivery::Argument`] the prompt is appended as the final
    /// argument; with [`PromptDelivery::Stdin`] it is written to stdin. Stdin
    /// is closed either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    pub async fn start(
        command: AgentCommand,
        prompt: &str,
        delivery: PromptDelivery,
        controller: CancellationController,
    ) -> Result<Self, ProcessError> {
        let command = match delivery {
            PromptDelivery::Argument => command.arg(prompt),
            PromptDelivery::Stdin => command,
        };
        tracing::info!(command = %command, ?delivery, "Starting generation");

        let mut handle = ProcessHandle::start(&command)?;
        let reader = handle.take_reader().ok_or_else(|| {
            ProcessError::Io(std::io::Error::other("process output already taken"))
        })?;

        let mut pending = VecDeque::new();
        if delivery == PromptDelivery::Stdin {
            if let Err(err) = handle.write_text(prompt).await {
                tracing::warn!(error = %err, "Failed to send prompt");
                let text = format!("[error] Failed to send prompt: {err}");
                pending.push_back(GenerationEvent::Log(LogLine {
                    raw: text.clone(),
                    display: Some(text),
                }));
            }
        }
        handle.close_stdin();

        Ok(Self {
            handle,
            reader,
            controller,
            stop: CancellationToken::new(),
            stop_requested: false,
            context_left: None,
            pending,
            finished: false,
        })
    }

    /// Token that requests a graceful stop when cancelled.
    #[must_use]
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Request a graceful stop.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Last reported context-left percentage.
    #[must_use]
    pub fn context_left(&self) -> Option<u8> {
        self.context_left
    }

    /// Lifecycle state of the process.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        self.handle.state()
    }

    /// Process id, if known.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.handle.pid()
    }

    /// Next event; `None` after [`GenerationEvent::Finished`] was returned.
    pub async fn next_event(&mut self) -> Option<GenerationEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }

            let stop = self.stop.clone();
            tokio::select! {
                biased;
                () = stop.cancelled(), if !self.stop_requested => {
                    self.stop_requested = true;
                    self.stop_process().await;
                }
                received = self.reader.recv_timeout(EVENT_POLL) => match received {
                    Received::Line(line) => self.observe_line(line),
                    Received::Idle => {
                        self.handle.poll();
                    }
                    Received::Closed => {
                        let outcome = self.finish().await;
                        self.pending.push_back(GenerationEvent::Finished(outcome));
                    }
                },
            }
        }
    }

    fn observe_line(&mut self, raw: String) {
        tracing::trace!(line = %raw, "Generation output");
        let display = format_log_line(&raw);
        let context = extract_context_left_percent(&raw);
        let phase = GenerationPhase::from_line(&raw);

        self.pending.push_back(GenerationEvent::Log(LogLine { raw, display }));
        if let Some(percent) = context {
            if self.context_left != Some(percent) {
                self.context_left = Some(percent);
                self.pending.push_back(GenerationEvent::ContextLeft(percent));
            }
        }
        if let Some(phase) = phase {
            tracing::debug!(?phase, "Generation phase");
            self.pending.push_back(GenerationEvent::Phase(phase));
        }
    }

    async fn stop_process(&mut self) {
        tracing::info!(pid = self.handle.pid(), "Stop requested for generation");
        match self.controller.stop(&mut self.handle).await {
            Ok(outcome) => tracing::info!(?outcome, "Generation process stopped"),
            Err(err) => tracing::warn!(error = %err, "Failed to stop generation process"),
        }
    }

    /// Wait for the process after its output closed. The child may outlive
    /// its pipes, so a stop request is still honored here.
    async fn finish(&mut self) -> GenerationOutcome {
        self.finished = true;
        let stop = self.stop.clone();
        let waited = tokio::select! {
            biased;
            () = stop.cancelled(), if !self.stop_requested => None,
            waited = self.handle.wait() => Some(waited),
        };
        let waited = match waited {
            Some(waited) => waited,
            None => {
                self.stop_requested = true;
                self.stop_process().await;
                self.handle.wait().await
            }
        };

        let exit_code = match waited {
            Ok(code) => code,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to wait for generation process");
                -1
            }
        };

        let outcome = if self.stop_requested {
            GenerationOutcome::Stopped { exit_code }
        } else if exit_code == 0 {
            GenerationOutcome::Completed
        } else {
            GenerationOutcome::Failed { exit_code }
        };
        tracing::info!(?outcome, "Generation finished");
        outcome
    }
}
