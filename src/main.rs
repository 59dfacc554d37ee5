//! `IdeaForge` - post idea extraction and agent process orchestration.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ideaforge::agent::AgentBackend;
use ideaforge::config::{AppConfig, ConfigLoader};
use ideaforge::display;
use ideaforge::generation::{
    build_generation_prompt, GenerationEvent, GenerationOutcome, GenerationScope,
    GenerationSession,
};
use ideaforge::posts::{extract_posts, format_post_view, ExtractStatus, NO_POSTS_MESSAGE};
use ideaforge::protocol::{fetch_model_catalog, read_model_status, DiscoveryError};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Codex,
    Gemini,
}

impl From<BackendArg> for AgentBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Codex => AgentBackend::Codex,
            BackendArg::Gemini => AgentBackend::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "ideaforge",
    about = "Generate and inspect graphic post ideas with an AI agent CLI",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace directory the agent runs in.
    #[arg(long, global = true, default_value = ".")]
    workdir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and show the posts of a markdown file.
    Posts {
        /// Markdown file to read.
        file: PathBuf,
        /// Show only this post (1-based).
        #[arg(long)]
        post: Option<usize>,
        /// Print the posts as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the models offered by Codex.
    Models,
    /// Show the current model and usage left.
    Status,
    /// Run the generation runbook through the agent.
    Generate {
        /// Runbook file sent as the prompt.
        #[arg(long)]
        runbook: PathBuf,
        /// Month to generate for.
        #[arg(long)]
        month: Option<String>,
        /// Week number to generate for (repeatable).
        #[arg(long = "week")]
        weeks: Vec<u32>,
        /// Agent backend (overrides config).
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
        /// Model (overrides config).
        #[arg(long)]
        model: Option<String>,
        /// Codex reasoning effort (overrides config).
        #[arg(long)]
        effort: Option<String>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = cli
        .config
        .clone()
        .map_or_else(ConfigLoader::discover, ConfigLoader::explicit);
    let config = match loader.load() {
        Ok(config) => config,
        Err(err) => {
            display::print_error(&err.to_string());
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Posts { file, post, json } => show_posts(&file, post, json),
        Commands::Models => list_models(&config, &cli.workdir).await,
        Commands::Status => show_status(&config, &cli.workdir).await,
        Commands::Generate {
            runbook,
            month,
            weeks,
            backend,
            model,
            effort,
        } => {
            let mut config = config;
            let backend = backend.map_or(config.agent.backend, AgentBackend::from);
            if let Some(model) = model {
                match backend {
                    AgentBackend::Codex => config.agent.model = model,
                    AgentBackend::Gemini => config.agent.gemini_model = model,
                }
            }
            if let Some(effort) = effort {
                config.agent.reasoning_effort = effort;
            }
            let scope = month.map(|month| GenerationScope { month, weeks });
            generate(&config, &cli.workdir, backend, &runbook, scope.as_ref()).await
        }
    }
}

fn show_posts(file: &Path, post: Option<usize>, json: bool) -> ExitCode {
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(err) => {
            display::print_error(&format!("Failed to read {}: {err}", file.display()));
            return ExitCode::FAILURE;
        }
    };
    let posts = extract_posts(&text);
    tracing::info!(file = %file.display(), posts = posts.len(), "Extracted posts");

    if json {
        match serde_json::to_string_pretty(&posts) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => {
                display::print_error(&format!("Failed to encode posts: {err}"));
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if let Some(number) = post {
        println!("{}", format_post_view(&posts, number.saturating_sub(1)));
        return ExitCode::SUCCESS;
    }

    match ExtractStatus::of(&posts) {
        ExtractStatus::NoPosts => println!("{NO_POSTS_MESSAGE}"),
        ExtractStatus::NoFields => {
            println!("Post headers were found, but no fields were detected.");
        }
        ExtractStatus::Fields => display::print_posts(&posts),
    }
    ExitCode::SUCCESS
}

async fn list_models(config: &AppConfig, workdir: &Path) -> ExitCode {
    let settings = config.discovery.catalog_settings(&config.agent, workdir);
    match fetch_model_catalog(&settings).await {
        Ok(catalog) => {
            display::print_model_catalog(&catalog);
            ExitCode::SUCCESS
        }
        Err(err) => report_discovery_error("Failed to load models", &err),
    }
}

async fn show_status(config: &AppConfig, workdir: &Path) -> ExitCode {
    let settings = config.discovery.status_settings(&config.agent, workdir);
    match read_model_status(&settings).await {
        Ok(status) => {
            display::print_status_lines(&status.compact_lines());
            ExitCode::SUCCESS
        }
        Err(err) => report_discovery_error("Failed to read model status", &err),
    }
}

fn report_discovery_error(context: &str, err: &DiscoveryError) -> ExitCode {
    display::print_error(&format!("{context}: {err}"));
    display::print_recent_output(&err.recent_output);
    ExitCode::FAILURE
}

async fn generate(
    config: &AppConfig,
    workdir: &Path,
    backend: AgentBackend,
    runbook: &Path,
    scope: Option<&GenerationScope>,
) -> ExitCode {
    let runbook_text = match std::fs::read_to_string(runbook) {
        Ok(text) => text,
        Err(err) => {
            display::print_error(&format!("Failed to read {}: {err}", runbook.display()));
            return ExitCode::FAILURE;
        }
    };
    let prompt = build_generation_prompt(&runbook_text, scope);
    let command = config.agent.exec_command(backend, workdir);

    display::print_system(&format!("Starting {} (new process).", backend.name()));
    display::print_log_line(&command.to_string());
    let model = config.agent.model_for(backend);
    match backend {
        AgentBackend::Codex => display::print_log_line(&format!(
            "[model] Running with {model} ({}).",
            config.agent.reasoning_effort
        )),
        AgentBackend::Gemini => {
            display::print_log_line(&format!("[model] Running with Gemini model {model}."));
        }
    }

    let mut session = match GenerationSession::start(
        command,
        &prompt,
        backend.prompt_delivery(),
        config.generation.controller(),
    )
    .await
    {
        Ok(session) => session,
        Err(err) => {
            display::print_error(&format!("Failed to start {}: {err}", backend.name()));
            return ExitCode::FAILURE;
        }
    };

    let stop = session.stop_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            display::print_system("Stop requested. Sending interrupt to the agent...");
            stop.cancel();
        }
    });

    while let Some(event) = session.next_event().await {
        match event {
            GenerationEvent::Log(line) => {
                if let Some(text) = line.display {
                    display::print_log_line(&text);
                }
            }
            GenerationEvent::ContextLeft(percent) => display::print_context_left(percent),
            GenerationEvent::Phase(phase) => {
                display::print_system(&format!("Generation: {}", phase.label()));
            }
            GenerationEvent::Finished(outcome) => {
                display::print_outcome(outcome, session.context_left());
                return match outcome {
                    GenerationOutcome::Completed => ExitCode::SUCCESS,
                    GenerationOutcome::Failed { .. } | GenerationOutcome::Stopped { .. } => {
                        ExitCode::FAILURE
                    }
                };
            }
        }
    }
    ExitCode::FAILURE
}
