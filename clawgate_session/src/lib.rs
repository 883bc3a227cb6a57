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

//! Conversation session store.
//!
//! This crate keeps the ordered transcript of every conversation the gateway
//! is handling, serves bounded views of it for prompt construction, and
//! persists it to disk.
//!
//! # Key Features
//! - One lock per transcript, so conversations never wait on each other
//! - History windows that never split a tool call from its result
//! - JSON Lines session files replaced atomically on save
//! - Lazy loading of stored sessions on first access

mod codec;
mod error;
mod history;
mod manager;
mod session;

pub use codec::{SESSION_EXTENSION, load, save};
pub use error::{Result, SessionError};
pub use history::{HistoryStats, bounded_window, window_start};
pub use manager::{SessionManager, sanitize_key};
pub use session::Transcript;
