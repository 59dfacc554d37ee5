//! Agent module for process spawning, output streaming and cancellation.

mod cancel;
mod command;
mod process;
mod reader;

pub use cancel::*;
pub use command::*;
pub use process::*;
pub use reader::*;
