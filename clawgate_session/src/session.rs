//! The transcript of a single conversation.
//!
//! A transcript is an append-only, ordered log of messages plus
//! conversation-level metadata. It carries its own lock, so work on one
//! conversation never waits on another.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use clawgate_core::{Message, Metadata};

use crate::history;

/// Lock-protected contents of a [`Transcript`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TranscriptState {
    pub(crate) messages: Vec<Message>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) metadata: Metadata,
}

impl TranscriptState {
    pub(crate) const fn empty(now: DateTime<Utc>) -> Self {
        Self {
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: Metadata::new(),
        }
    }
}

/// A conversation session with its full message history.
///
/// All access goes through `&self` methods: readers take a shared lock,
/// mutators an exclusive one. Values returned to callers are copies and
/// never alias the stored messages.
#[derive(Debug)]
pub struct Transcript {
    key: String,
    state: RwLock<TranscriptState>,
    /// Held for the whole of a save so writes of one transcript land in order.
    persist: Mutex<()>,
}

impl Transcript {
    /// Create an empty transcript stamped with the current time.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self::from_state(key.into(), TranscriptState::empty(Utc::now()))
    }

    pub(crate) const fn from_state(key: String, state: TranscriptState) -> Self {
        Self {
            key,
            state: RwLock::new(state),
            persist: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append a message to the end of the transcript.
    pub fn append(&self, message: Message) {
        let mut state = self.write();
        state.messages.push(message);
        state.updated_at = Utc::now();
    }

    /// Copy of the last `limit` messages, or of all of them when `limit` is
    /// zero or covers the whole transcript.
    #[must_use]
    pub fn snapshot(&self, limit: usize) -> Vec<Message> {
        let state = self.read();
        let start = if limit == 0 {
            0
        } else {
            state.messages.len().saturating_sub(limit)
        };
        state.messages[start..].to_vec()
    }

    /// Like [`Transcript::snapshot`], but never cuts a tool-call group in two.
    ///
    /// The result may hold more than `limit` messages when a group straddles
    /// the naive cut point.
    #[must_use]
    pub fn bounded_snapshot(&self, limit: usize) -> Vec<Message> {
        let state = self.read();
        history::bounded_window(&state.messages, limit).to_vec()
    }

    /// Drop every message. Metadata and the creation time are kept.
    pub fn clear(&self) {
        let mut state = self.write();
        state.messages.clear();
        state.updated_at = Utc::now();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().messages.is_empty()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.read().created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.read().updated_at
    }

    /// Copy of the conversation-level metadata.
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        self.read().metadata.clone()
    }

    pub fn set_metadata(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut state = self.write();
        state.metadata.insert(key.into(), value.into());
        state.updated_at = Utc::now();
    }

    /// Run `f` against the current state under the shared lock.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&TranscriptState) -> R) -> R {
        f(&self.read())
    }

    pub(crate) fn persist_guard(&self) -> MutexGuard<'_, ()> {
        self.persist.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Poisoned locks are recovered: no mutation leaves partial state behind.
    fn read(&self) -> RwLockReadGuard<'_, TranscriptState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TranscriptState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawgate_core::{Role, ToolCall};

    #[test]
    fn test_append_preserves_order() {
        let transcript = Transcript::new("cli:default");
        assert!(transcript.is_empty());

        for i in 0..10 {
            transcript.append(Message::user(format!("Message {i}")));
        }

        let all = transcript.snapshot(0);
        assert_eq!(all.len(), 10);
        for (i, msg) in all.iter().enumerate() {
            assert_eq!(msg.content, format!("Message {i}"));
        }
        assert_eq!(transcript.len(), 10);
    }

    #[test]
    fn test_snapshot_limits() {
        let transcript = Transcript::new("k");
        for i in 0..10 {
            transcript.append(Message::user(format!("Message {i}")));
        }

        let last = transcript.snapshot(3);
        assert_eq!(last.len(), 3);
        assert_eq!(last[0].content, "Message 7");
        assert_eq!(transcript.snapshot(100).len(), 10);
        assert_eq!(transcript.snapshot(10).len(), 10);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let transcript = Transcript::new("k");
        transcript.append(Message::user("original"));

        let mut copy = transcript.snapshot(0);
        copy[0].content = "changed".to_string();
        copy.push(Message::user("extra"));

        let again = transcript.snapshot(0);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].content, "original");
    }

    #[test]
    fn test_append_refreshes_updated_at() {
        let transcript = Transcript::new("k");
        let created = transcript.created_at();
        let before = transcript.updated_at();

        std::thread::sleep(std::time::Duration::from_millis(5));
        transcript.append(Message::user("hi"));

        assert_eq!(transcript.created_at(), created);
        assert!(transcript.updated_at() > before);
    }

    #[test]
    fn test_clear_keeps_metadata_and_creation_time() {
        let transcript = Transcript::new("k");
        transcript.set_metadata("channel", "telegram");
        transcript.append(Message::user("hi"));
        let created = transcript.created_at();
        let before = transcript.updated_at();

        std::thread::sleep(std::time::Duration::from_millis(5));
        transcript.clear();

        assert!(transcript.is_empty());
        assert_eq!(transcript.created_at(), created);
        assert!(transcript.updated_at() > before);
        assert_eq!(transcript.metadata()["channel"], "telegram");
    }

    #[test]
    fn test_bounded_snapshot_keeps_tool_group() {
        let transcript = Transcript::new("k");
        transcript.append(Message::user("A"));
        transcript.append(
            Message::assistant("B").with_tool_calls(vec![ToolCall::new("t1", "bash")]),
        );
        transcript.append(Message::tool("t1", "C"));
        transcript.append(Message::user("D"));

        let naive = transcript.snapshot(2);
        assert_eq!(naive[0].role, Role::Tool);

        let bounded = transcript.bounded_snapshot(2);
        let contents: Vec<_> = bounded.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["B", "C", "D"]);
    }
}
