//! JSON-lines protocol spoken with the agent's app server.

mod catalog;
mod client;
mod discovery;

pub use catalog::*;
pub use client::*;
pub use discovery::*;
