//! Agent command construction.
//!
//! This module provides a builder for the command line of an external agent
//! process, plus the exec commands of the supported agent backends.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Model used when none is configured for Codex.
pub const DEFAULT_CODEX_MODEL: &str = "gpt-5.3-codex";
/// Model used when none is configured for Gemini.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
/// Reasoning effort used when none is configured or advertised.
pub const DEFAULT_REASONING_EFFORT: &str = "medium";

/// How the child's output streams are wired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Stdout and stderr are interleaved onto one line stream.
    #[default]
    Merged,
    /// Only stdout is read; stderr is discarded.
    StdoutOnly,
}

/// Builder for an agent process command line.
#[derive(Debug, Clone)]
pub struct AgentCommand {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    output: OutputMode,
    new_process_group: bool,
}

impl AgentCommand {
    /// Create a command for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            output: OutputMode::default(),
            new_process_group: true,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the process.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Choose how output streams are wired.
    #[must_use]
    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.output = mode;
        self
    }

    /// Spawn the child as leader of its own process group (default on).
    ///
    /// Group signals and tree kills are only possible for group leaders.
    #[must_use]
    pub fn new_process_group(mut self, enabled: bool) -> Self {
        self.new_process_group = enabled;
        self
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Working directory, if set.
    #[must_use]
    pub fn get_working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Output wiring.
    #[must_use]
    pub fn get_output_mode(&self) -> OutputMode {
        self.output
    }

    /// Whether the child gets its own process group.
    #[must_use]
    pub fn uses_process_group(&self) -> bool {
        self.new_process_group
    }

    /// Command line for logs, with long arguments shortened.
    #[must_use]
    pub fn display_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().map(|arg| shorten(arg, 100)));
        parts.join(" ")
    }
}

impl fmt::Display for AgentCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$ {}", self.display_line())
    }
}

fn shorten(arg: &str, max_chars: usize) -> String {
    if arg.chars().count() <= max_chars {
        return arg.to_string();
    }
    let head: String = arg.chars().take(max_chars).collect();
    format!("\"{head}...\"")
}

/// How the prompt reaches a generation process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptDelivery {
    /// Written to stdin, then stdin is closed.
    Stdin,
    /// Appended as the final argument.
    Argument,
}

/// Supported agent command-line tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentBackend {
    #[default]
    Codex,
    Gemini,
}

impl AgentBackend {
    /// How this backend expects its prompt.
    #[must_use]
    pub fn prompt_delivery(self) -> PromptDelivery {
        match self {
            Self::Codex => PromptDelivery::Stdin,
            Self::Gemini => PromptDelivery::Argument,
        }
    }

    /// Human-readable backend name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Codex => "Codex",
            Self::Gemini => "Gemini",
        }
    }
}

/// Build the non-interactive Codex exec command.
///
/// Blank model or effort fall back to the defaults. The prompt is read
/// from stdin (`-`).
#[must_use]
pub fn codex_exec_command(
    program: &str,
    base_dir: &Path,
    model: &str,
    reasoning_effort: &str,
) -> AgentCommand {
    let model = non_blank_or(model, DEFAULT_CODEX_MODEL);
    let effort = non_blank_or(reasoning_effort, DEFAULT_REASONING_EFFORT);

    AgentCommand::new(program)
        .args(["exec", "-m", model, "-c"])
        .arg(format!(
            "model_reasoning_effort=\"{}\"",
            escape_toml_string(effort)
        ))
        .args([
            "--json",
            "--dangerously-bypass-approvals-and-sandbox",
            "--skip-git-repo-check",
            "--color",
            "never",
            "-C",
        ])
        .arg(base_dir.display().to_string())
        .arg("-")
        .working_dir(base_dir)
        .output_mode(OutputMode::Merged)
}

/// Build the Gemini command; the prompt follows as the final argument.
#[must_use]
pub fn gemini_exec_command(program: &str, base_dir: &Path, model: &str) -> AgentCommand {
    let model = non_blank_or(model, DEFAULT_GEMINI_MODEL);

    AgentCommand::new(program)
        .args(["-m", model, "-y", "-C"])
        .arg(base_dir.display().to_string())
        .arg("-p")
        .working_dir(base_dir)
        .output_mode(OutputMode::Merged)
}

/// Build the Codex app-server command used by discovery sessions.
#[must_use]
pub fn codex_app_server_command(program: &str, base_dir: &Path) -> AgentCommand {
    AgentCommand::new(program)
        .args(["app-server", "--listen", "stdio://"])
        .working_dir(base_dir)
        .output_mode(OutputMode::StdoutOnly)
}

fn non_blank_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

fn escape_toml_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
