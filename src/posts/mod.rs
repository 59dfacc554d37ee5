//! Post idea parsing.
//!
//! Turns loosely formatted, agent-generated markdown into ordered
//! [`PostRecord`]s. Parsing never fails; unrecognized lines are dropped.

mod canonical;
mod classify;
mod extract;
mod format;

pub use canonical::*;
pub use classify::*;
pub use extract::*;
pub use format::*;
