//! Generation runs: prompt assembly and the long-running agent session.

mod prompt;
mod session;

pub use prompt::*;
pub use session::*;
