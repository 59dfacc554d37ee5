//! Graceful-then-forced process cancellation.

use std::time::Duration;

use super::process::{ProcessError, ProcessHandle, ProcessState};

/// Default grace period between the graceful signal and the forced kill.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Signal capabilities the controller may rely on.
///
/// Supplied by the caller; [`PlatformCapabilities::current`] describes the
/// platform this binary was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Send the graceful stop as an interrupt to the whole process group.
    pub interrupt_group: bool,
    /// Force-kill the whole process tree instead of only the direct child.
    pub process_tree_kill: bool,
}

impl PlatformCapabilities {
    /// Capabilities of the current platform.
    #[must_use]
    pub fn current() -> Self {
        Self {
            interrupt_group: cfg!(unix),
            process_tree_kill: cfg!(any(unix, windows)),
        }
    }

    /// Terminate and kill the direct child only.
    #[must_use]
    pub fn direct_child_only() -> Self {
        Self {
            interrupt_group: false,
            process_tree_kill: false,
        }
    }
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self::current()
    }
}

/// Graceful signal that was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// Interrupt delivered to the process group (Ctrl+C semantics).
    Interrupt,
    /// Terminate request delivered to the direct child.
    Terminate,
}

/// How a stop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The process had already exited; nothing was sent.
    AlreadyExited { exit_code: i32 },
    /// The process exited within the grace period.
    Graceful { signal: StopSignal, exit_code: i32 },
    /// The process outlived the grace period and was killed.
    Forced { exit_code: i32 },
}

impl StopOutcome {
    /// Exit code the process ended with.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::AlreadyExited { exit_code }
            | Self::Graceful { exit_code, .. }
            | Self::Forced { exit_code } => exit_code,
        }
    }
}

/// Escalates a running process through graceful signal, wait, force kill.
#[derive(Debug, Clone, Copy)]
pub struct CancellationController {
    capabilities: PlatformCapabilities,
    grace_period: Duration,
}

impl Default for CancellationController {
    fn default() -> Self {
        Self::new(PlatformCapabilities::current(), DEFAULT_GRACE_PERIOD)
    }
}

impl CancellationController {
    /// Create a controller with explicit capabilities and grace period.
    #[must_use]
    pub fn new(capabilities: PlatformCapabilities, grace_period: Duration) -> Self {
        Self {
            capabilities,
            grace_period,
        }
    }

    /// Replace the grace period.
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Capabilities in use.
    #[must_use]
    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    /// Grace period before the forced kill.
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Stop the process, escalating to a forced kill after the grace period.
    ///
    /// Stopping an already-exited process is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting on or killing the process fails.
    pub async fn stop(&self, handle: &mut ProcessHandle) -> Result<StopOutcome, ProcessError> {
        if let Some(exit_code) = handle.poll() {
            tracing::debug!(pid = handle.pid(), exit_code, "Stop requested on exited process");
            return Ok(StopOutcome::AlreadyExited { exit_code });
        }

        handle.close_stdin();
        handle.set_state(ProcessState::StoppingGraceful);
        let signal = self.send_graceful(handle);
        tracing::info!(pid = handle.pid(), ?signal, grace = ?self.grace_period, "Sent graceful stop");

        match tokio::time::timeout(self.grace_period, handle.wait()).await {
            Ok(Ok(exit_code)) => return Ok(StopOutcome::Graceful { signal, exit_code }),
            Ok(Err(err)) => return Err(ProcessError::Io(err)),
            Err(_) => {}
        }

        handle.set_state(ProcessState::StoppingForced);
        tracing::warn!(pid = handle.pid(), "Process outlived grace period, force killing");
        if self.capabilities.process_tree_kill {
            kill_tree(handle).await;
        }
        let exit_code = handle.kill().await?;
        Ok(StopOutcome::Forced { exit_code })
    }

    #[cfg(unix)]
    fn send_graceful(&self, handle: &mut ProcessHandle) -> StopSignal {
        use nix::sys::signal::{kill, killpg, Signal};

        let Some(pid) = nix_pid(handle) else {
            return StopSignal::Terminate;
        };

        let (signal, result) = if self.capabilities.interrupt_group && handle.uses_process_group() {
            (StopSignal::Interrupt, killpg(pid, Signal::SIGINT))
        } else {
            (StopSignal::Terminate, kill(pid, Signal::SIGTERM))
        };
        if let Err(errno) = result {
            tracing::warn!(pid = %pid, ?signal, error = %errno, "Failed to send graceful signal");
        }
        signal
    }

    /// Ask the whole tree to close without forcing it; the forced step
    /// escalates if this is ignored.
    #[cfg(windows)]
    fn send_graceful(&self, handle: &mut ProcessHandle) -> StopSignal {
        use std::process::Stdio;

        let Some(pid) = handle.pid() else {
            return StopSignal::Terminate;
        };
        let tree = self.capabilities.process_tree_kill && handle.uses_process_group();
        let result = std::process::Command::new("taskkill")
            .args(taskkill_args(pid, tree, false))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(err) = result {
            tracing::warn!(pid, error = %err, "Failed to send terminate request");
        }
        StopSignal::Terminate
    }

    #[cfg(not(any(unix, windows)))]
    fn send_graceful(&self, _handle: &mut ProcessHandle) -> StopSignal {
        StopSignal::Terminate
    }
}

#[cfg(unix)]
fn nix_pid(handle: &ProcessHandle) -> Option<nix::unistd::Pid> {
    let pid = handle.pid()?;
    Some(nix::unistd::Pid::from_raw(i32::try_from(pid).ok()?))
}

#[cfg(unix)]
async fn kill_tree(handle: &mut ProcessHandle) {
    use nix::sys::signal::{killpg, Signal};

    if !handle.uses_process_group() {
        return;
    }
    if let Some(pid) = nix_pid(handle) {
        if let Err(errno) = killpg(pid, Signal::SIGKILL) {
            tracing::warn!(pid = %pid, error = %errno, "Failed to kill process group");
        }
    }
}

#[cfg(windows)]
async fn kill_tree(handle: &mut ProcessHandle) {
    use std::process::Stdio;

    let Some(pid) = handle.pid() else {
        return;
    };
    let result = tokio::process::Command::new("taskkill")
        .args(taskkill_args(pid, true, true))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(err) = result {
        tracing::warn!(pid, error = %err, "taskkill failed");
    }
}

/// `taskkill` arguments; without `/F` the request is a polite close.
#[cfg_attr(not(windows), allow(dead_code))]
fn taskkill_args(pid: u32, tree: bool, force: bool) -> Vec<String> {
    let mut args = vec!["/PID".to_string(), pid.to_string()];
    if tree {
        args.push("/T".to_string());
    }
    if force {
        args.push("/F".to_string());
    }
    args
}

#[cfg(not(any(unix, windows)))]
async fn kill_tree(_handle: &mut ProcessHandle) {}
