//! Telemetry extraction from agent output: context remaining, rate limits,
//! and log-line formatting.

mod context;
mod log;
mod rate_limits;

pub use context::*;
pub use log::*;
pub use rate_limits::*;
