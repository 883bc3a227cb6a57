use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors raised by the session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No persisted transcript exists for the key.
    #[error("No stored session at {}", path.display())]
    NotFound { path: PathBuf },

    /// A stored record failed to decode. `record` is the zero-based position
    /// of the record in the file.
    #[error("Corrupt session file {} at record {record}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        record: usize,
        source: serde_json::Error,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode session {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },

    #[error("Session already exists: {0}")]
    AlreadyExists(String),
}

impl SessionError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
