//! Agent process spawning and control.
//!
//! A [`ProcessHandle`] owns one spawned agent process: its stdin, the
//! output pipes (until handed to a [`LineStreamReader`]), and its lifecycle
//! state.

use std::process::{ExitStatus, Stdio};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;

use super::command::{AgentCommand, OutputMode};
use super::reader::LineStreamReader;

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The executable was not found.
    #[error("Agent executable not found: {program}")]
    NotFound { program: String },
    /// Permission denied when spawning.
    #[error("Permission denied executing {program}")]
    PermissionDenied { program: String },
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    fn from_io(program: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound {
                program: program.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                program: program.to_string(),
            },
            _ => Self::Io(err),
        }
    }
}

/// Error type for operations on a running process.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// The process could not be started.
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    /// The process has already exited.
    #[error("Process is not running (exit code {exit_code})")]
    NotRunning { exit_code: i32 },
    /// Stdin was closed before the write.
    #[error("Process stdin is closed")]
    StdinClosed,
    /// Writing to or waiting on the process failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The payload could not be encoded as JSON.
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Lifecycle state of an agent process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    #[default]
    NotStarted,
    Running,
    StoppingGraceful,
    StoppingForced,
    Exited(i32),
}

impl ProcessState {
    /// True once the OS has reported the process exit.
    #[must_use]
    pub fn is_exited(self) -> bool {
        matches!(self, Self::Exited(_))
    }
}

/// A running agent process.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    stdin: Option<ChildStdin>,
    program: String,
    pid: Option<u32>,
    own_group: bool,
    state: ProcessState,
    exited: CancellationToken,
}

impl ProcessHandle {
    /// Spawn the process described by `command`.
    ///
    /// Stdin and stdout are always piped. Stderr is piped for
    /// [`OutputMode::Merged`] and discarded otherwise.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the process fails to spawn.
    pub fn start(command: &AgentCommand) -> Result<Self, SpawnError> {
        let mut cmd = Command::new(command.program());
        cmd.args(command.get_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true);

        match command.get_output_mode() {
            OutputMode::Merged => cmd.stderr(Stdio::piped()),
            OutputMode::StdoutOnly => cmd.stderr(Stdio::null()),
        };

        if let Some(dir) = command.get_working_dir() {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        {
            if command.uses_process_group() {
                cmd.process_group(0);
            }
        }

        #[cfg(windows)]
        {
            if command.uses_process_group() {
                cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
            }
        }

        let mut child = cmd
            .spawn()
            .map_err(|err| SpawnError::from_io(command.program(), err))?;
        let stdin = child.stdin.take();
        let pid = child.id();

        tracing::info!(program = command.program(), pid, "Spawned agent process");

        Ok(Self {
            child,
            stdin,
            program: command.program().to_string(),
            pid,
            own_group: cfg!(any(unix, windows)) && command.uses_process_group(),
            state: ProcessState::Running,
            exited: CancellationToken::new(),
        })
    }

    /// Start the background reader for this process's output.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_reader(&mut self) -> Option<LineStreamReader> {
        let stdout = self.child.stdout.take()?;
        let stderr = self.child.stderr.take();
        Some(LineStreamReader::spawn(stdout, stderr, self.exited.clone()))
    }

    /// Program this handle was started from.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// OS process id captured at spawn.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the process leads its own process group.
    #[must_use]
    pub fn uses_process_group(&self) -> bool {
        self.own_group
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ProcessState) {
        if self.state.is_exited() {
            return;
        }
        tracing::debug!(pid = self.pid, from = ?self.state, to = ?state, "Process state transition");
        self.state = state;
    }

    /// Check for exit without blocking.
    ///
    /// Returns the exit code once the process has exited.
    pub fn poll(&mut self) -> Option<i32> {
        if let ProcessState::Exited(code) = self.state {
            return Some(code);
        }
        match self.child.try_wait() {
            Ok(Some(status)) => Some(self.mark_exited(status)),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(pid = self.pid, error = %err, "Failed to query process status");
                None
            }
        }
    }

    /// Wait for the process to exit. Stdin is closed first.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<i32> {
        if let ProcessState::Exited(code) = self.state {
            return Ok(code);
        }
        self.stdin = None;
        let status = self.child.wait().await?;
        Ok(self.mark_exited(status))
    }

    /// Forcefully kill the direct child and reap it.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub async fn kill(&mut self) -> std::io::Result<i32> {
        if let ProcessState::Exited(code) = self.state {
            return Ok(code);
        }
        self.child.kill().await?;
        let status = self.child.wait().await?;
        Ok(self.mark_exited(status))
    }

    /// Send a kill request to the direct child without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal cannot be sent.
    pub fn start_kill(&mut self) -> std::io::Result<()> {
        if self.state.is_exited() {
            return Ok(());
        }
        self.child.start_kill()
    }

    /// Serialize `payload` as one JSON line and flush it to stdin.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::NotRunning` if the process has exited,
    /// `ProcessError::StdinClosed` if stdin was closed, or an I/O error.
    pub async fn write_line<T: Serialize + ?Sized>(
        &mut self,
        payload: &T,
    ) -> Result<(), ProcessError> {
        let mut line = serde_json::to_string(payload)?;
        line.push('\n');
        tracing::trace!(pid = self.pid, %line, "Writing JSON line");
        self.write_text(&line).await
    }

    /// Write raw text to stdin and flush.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ProcessHandle::write_line`].
    pub async fn write_text(&mut self, text: &str) -> Result<(), ProcessError> {
        if let Some(exit_code) = self.poll() {
            return Err(ProcessError::NotRunning { exit_code });
        }
        let stdin = self.stdin.as_mut().ok_or(ProcessError::StdinClosed)?;
        let result = async {
            stdin.write_all(text.as_bytes()).await?;
            stdin.flush().await
        }
        .await;

        if let Err(err) = result {
            self.stdin = None;
            return Err(ProcessError::Io(err));
        }
        Ok(())
    }

    /// Close stdin, signalling end of input to the child.
    pub fn close_stdin(&mut self) {
        if self.stdin.take().is_some() {
            tracing::debug!(pid = self.pid, "Closed process stdin");
        }
    }

    fn mark_exited(&mut self, status: ExitStatus) -> i32 {
        let code = exit_code(status);
        tracing::debug!(pid = self.pid, from = ?self.state, exit_code = code, "Process exited");
        self.state = ProcessState::Exited(code);
        self.stdin = None;
        self.exited.cancel();
        code
    }
}

/// Exit code of a finished process; signal deaths map to `-signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal().map_or(-1, |signal| -signal)
    }

    #[cfg(not(unix))]
    {
        -1
    }
}
