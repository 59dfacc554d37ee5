//! Agent process tests.


use ideaforge::agent::AgentCommand;

/// A command running `script` under `sh -c`.
pub fn sh(script: &str) -> AgentCommand {
    AgentCommand::new("sh").arg("-c").arg(script)
}

/// True while a process with `pid` exists and is not a zombie.
#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    if std::path::Path::new("/proc/self").exists() {
        // The state letter follows the parenthesized command name.
        return std::fs::read_to_string(format!("/proc/{pid}/stat")).is_ok_and(|stat| {
            stat.rsplit_once(") ")
                .is_some_and(|(_, rest)| !rest.starts_with('Z'))
        });
    }
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(raw), None).is_ok()
}

/// Verify the public agent types are exported from the library.
#[test]
fn test_all_agent_types_exported() {
    use ideaforge::agent::{
        CancellationController, LineStreamReader, OutputMode, PlatformCapabilities,
        ProcessError, ProcessHandle, ProcessState, Received, SpawnError, StopOutcome,
        StopSignal,
    };

    let _ = CancellationController::default();
    let _ = PlatformCapabilities::direct_child_only();
    let _ = OutputMode::StdoutOnly;
    let _ = ProcessState::NotStarted;
    let _ = Received::Idle;
    let _ = StopSignal::Interrupt;
    let _ = StopOutcome::AlreadyExited { exit_code: 0 };
    let _: fn() -> ProcessError = || ProcessError::StdinClosed;
    let _: fn() -> SpawnError = || SpawnError::NotFound {
        program: String::new(),
    };
    let _: Option<ProcessHandle> = None;
    let _: Option<LineStreamReader> = None;
}
