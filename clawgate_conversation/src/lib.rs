#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Bridge between the agent loop and the session store.
//!
//! The agent loop speaks in turns made of structured content blocks; the
//! session store keeps flat transcript messages. `AgentHelper` converts the
//! former into the latter and appends them, optionally persisting right away.

mod error;
mod helper;

pub use error::ConversationError;
pub use helper::{AgentHelper, UpdateSessionOptions, to_session_message};
