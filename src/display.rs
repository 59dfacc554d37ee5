//! Colored CLI display utilities.
//!
//! This module prints generation logs, post views, and discovery results to
//! the terminal.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::generation::GenerationOutcome;
use crate::posts::{display_rows, PostRecord};
use crate::protocol::ModelCatalogEntry;
use crate::telemetry::LogTag;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Truncate a string to a maximum number of characters, adding ellipsis if
/// truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

/// Print one generation log line, colored by its tag.
pub fn print_log_line(line: &str) {
    if line.trim().is_empty() {
        return;
    }
    match LogTag::classify(line) {
        Some(LogTag::Error) => println!("{}", line.red()),
        Some(LogTag::Status) => println!("{}", line.blue()),
        Some(LogTag::System) => println!("{}", line.green()),
        Some(LogTag::Model) => println!("{}", line.magenta()),
        None => println!("{line}"),
    }
    let _ = io::stdout().flush();
}

/// Print a `[system]` line.
pub fn print_system(message: &str) {
    print_log_line(&format!("[system] {message}"));
}

/// Print an `[error]` line to stderr.
pub fn print_error(message: &str) {
    eprintln!(
        "{} {} {}",
        timestamp().dimmed(),
        "[error]".red().bold(),
        message.red()
    );
}

/// Print diagnostic output captured from a failed session.
pub fn print_recent_output(lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    eprintln!("{}", "Recent output:".dimmed());
    for line in lines {
        eprintln!("  {}", truncate(line, 200).dimmed());
    }
}

/// Print a context-left update.
pub fn print_context_left(percent: u8) {
    println!(
        "{} {} Context left: {}%",
        timestamp().dimmed(),
        "[status]".blue().bold(),
        percent
    );
    let _ = io::stdout().flush();
}

/// Final status line of a generation run.
#[must_use]
pub fn outcome_text(outcome: GenerationOutcome) -> String {
    match outcome {
        GenerationOutcome::Completed => "Generation: completed".to_string(),
        GenerationOutcome::Failed { exit_code } => {
            format!("Generation: failed (exit {exit_code})")
        }
        GenerationOutcome::Stopped { .. } => "Generation: stopped".to_string(),
    }
}

/// Print the final status line of a generation run.
pub fn print_outcome(outcome: GenerationOutcome, context_left: Option<u8>) {
    let text = outcome_text(outcome);
    match outcome {
        GenerationOutcome::Completed => println!("{}", text.green().bold()),
        GenerationOutcome::Failed { .. } => println!("{}", text.red().bold()),
        GenerationOutcome::Stopped { .. } => println!("{}", text.yellow().bold()),
    }
    match context_left {
        Some(percent) => println!("Context left: {percent}%"),
        None => println!("Context left: unavailable"),
    }
    let _ = io::stdout().flush();
}

/// Print every post as a header line followed by aligned field rows.
pub fn print_posts(posts: &[PostRecord]) {
    for (index, post) in posts.iter().enumerate() {
        let title = if post.header().is_empty() {
            format!("Post {}", index + 1)
        } else {
            post.header().to_string()
        };
        println!("{}", title.cyan().bold());

        let rows = display_rows(post);
        let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, value) in rows {
            let mut lines = value.lines();
            let first = lines.next().unwrap_or_default();
            println!("  {:<width$}  {}", name.bold(), first);
            for line in lines {
                println!("  {:<width$}  {}", "", line);
            }
        }
        println!();
    }
    let _ = io::stdout().flush();
}

/// Print a model catalog, marking the default model.
pub fn print_model_catalog(catalog: &[ModelCatalogEntry]) {
    for entry in catalog {
        let marker = if entry.is_default { "*" } else { " " };
        let efforts: Vec<String> = entry
            .efforts
            .iter()
            .map(|effort| {
                if *effort == entry.default_effort {
                    format!("{effort} (default)")
                } else {
                    effort.clone()
                }
            })
            .collect();
        println!(
            "{} {} {}",
            marker.green().bold(),
            entry.model.cyan(),
            efforts.join(", ").dimmed()
        );
    }
    let _ = io::stdout().flush();
}

/// Print `[status]` lines.
pub fn print_status_lines(lines: &[String]) {
    for line in lines {
        print_log_line(&format!("[status] {line}"));
    }
}
