//! `IdeaForge` - post idea extraction and agent process orchestration.

pub mod agent;
pub mod config;
pub mod display;
pub mod generation;
pub mod posts;
pub mod protocol;
pub mod telemetry;
