//! Configuration types.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::{
    codex_app_server_command, codex_exec_command, gemini_exec_command, AgentBackend,
    AgentCommand, CancellationController, PlatformCapabilities, DEFAULT_CODEX_MODEL,
    DEFAULT_GEMINI_MODEL, DEFAULT_REASONING_EFFORT,
};
use crate::protocol::{ClientIdentity, DiscoverySettings};

/// Agent backend selection and executables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Backend used for generation (codex or gemini).
    #[serde(default)]
    pub backend: AgentBackend,
    /// Codex executable.
    #[serde(default = "default_codex_program")]
    pub codex_program: String,
    /// Gemini executable.
    #[serde(default = "default_gemini_program")]
    pub gemini_program: String,
    /// Codex model.
    #[serde(default = "default_model")]
    pub model: String,
    /// Codex reasoning effort.
    #[serde(default = "default_reasoning_effort")]
    pub reasoning_effort: String,
    /// Gemini model.
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
}

fn default_codex_program() -> String {
    "codex".to_string()
}

fn default_gemini_program() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    DEFAULT_CODEX_MODEL.to_string()
}

fn default_reasoning_effort() -> String {
    DEFAULT_REASONING_EFFORT.to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            backend: AgentBackend::default(),
            codex_program: default_codex_program(),
            gemini_program: default_gemini_program(),
            model: default_model(),
            reasoning_effort: default_reasoning_effort(),
            gemini_model: default_gemini_model(),
        }
    }
}

impl AgentConfig {
    /// Exec command for a generation run of `backend` in `base_dir`.
    #[must_use]
    pub fn exec_command(&self, backend: AgentBackend, base_dir: &Path) -> AgentCommand {
        match backend {
            AgentBackend::Codex => codex_exec_command(
                &self.codex_program,
                base_dir,
                &self.model,
                &self.reasoning_effort,
            ),
            AgentBackend::Gemini => {
                gemini_exec_command(&self.gemini_program, base_dir, &self.gemini_model)
            }
        }
    }

    /// Model shown for `backend`.
    #[must_use]
    pub fn model_for(&self, backend: AgentBackend) -> &str {
        match backend {
            AgentBackend::Codex => &self.model,
            AgentBackend::Gemini => &self.gemini_model,
        }
    }
}

/// Discovery session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Deadline for the model catalog request, in seconds.
    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_secs: f64,
    /// Deadline for each model status request, in seconds.
    #[serde(default = "default_status_timeout")]
    pub status_timeout_secs: f64,
    /// Grace period before a discovery process is force-killed.
    #[serde(default = "default_discovery_grace_ms")]
    pub grace_period_ms: u64,
    /// Client name sent in the handshake.
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

fn default_catalog_timeout() -> f64 {
    15.0
}

fn default_status_timeout() -> f64 {
    45.0
}

fn default_discovery_grace_ms() -> u64 {
    2500
}

fn default_client_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            catalog_timeout_secs: default_catalog_timeout(),
            status_timeout_secs: default_status_timeout(),
            grace_period_ms: default_discovery_grace_ms(),
            client_name: default_client_name(),
        }
    }
}

impl DiscoveryConfig {
    /// Settings for a model catalog session.
    #[must_use]
    pub fn catalog_settings(&self, agent: &AgentConfig, base_dir: &Path) -> DiscoverySettings {
        self.settings(agent, base_dir, self.catalog_timeout_secs)
    }

    /// Settings for a model status session.
    #[must_use]
    pub fn status_settings(&self, agent: &AgentConfig, base_dir: &Path) -> DiscoverySettings {
        self.settings(agent, base_dir, self.status_timeout_secs)
    }

    fn settings(&self, agent: &AgentConfig, base_dir: &Path, timeout_secs: f64) -> DiscoverySettings {
        DiscoverySettings {
            command: codex_app_server_command(&agent.codex_program, base_dir),
            timeout: seconds(timeout_secs),
            identity: ClientIdentity::named(&self.client_name),
            controller: CancellationController::new(
                PlatformCapabilities::current(),
                Duration::from_millis(self.grace_period_ms),
            ),
        }
    }
}

/// Generation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Grace period before a stopped generation is force-killed.
    #[serde(default = "default_generation_grace_ms")]
    pub grace_period_ms: u64,
}

fn default_generation_grace_ms() -> u64 {
    2000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_generation_grace_ms(),
        }
    }
}

impl GenerationConfig {
    /// Controller used to stop a generation run.
    #[must_use]
    pub fn controller(&self) -> CancellationController {
        CancellationController::new(
            PlatformCapabilities::current(),
            Duration::from_millis(self.grace_period_ms),
        )
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Non-finite or negative values become zero.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
