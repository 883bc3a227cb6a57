use clawgate_session::SessionError;
use thiserror::Error;

/// Errors that can occur while recording conversation turns.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// The session could not be obtained from the store.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The turns were appended in memory but could not be written to disk.
    /// The transcript keeps the appended messages; saving again may succeed.
    #[error("Session updated in memory but not persisted: {0}")]
    Durability(#[source] SessionError),
}
