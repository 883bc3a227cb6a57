//! Recording agent turns into session transcripts.

use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use tracing::{debug, error};

use clawgate_core::{
    AgentMessage, AgentRole, ContentBlock, Media, Message, Role, TOOL_CALL_ID_KEY, TOOL_NAME_KEY,
    ToolCall,
};
use clawgate_session::{SessionManager, Transcript};

use crate::error::ConversationError;

/// Options for [`AgentHelper::update_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSessionOptions {
    /// Save the transcript to disk once all turns are appended.
    pub save_immediately: bool,
}

impl Default for UpdateSessionOptions {
    fn default() -> Self {
        Self {
            save_immediately: true,
        }
    }
}

impl UpdateSessionOptions {
    /// Append only; leave persistence to the caller.
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            save_immediately: false,
        }
    }
}

/// Appends agent turns to transcripts owned by a [`SessionManager`].
///
/// Shared by every agent worker, so it is cheap to clone.
#[derive(Debug, Clone)]
pub struct AgentHelper {
    session_manager: Arc<SessionManager>,
}

impl AgentHelper {
    #[must_use]
    pub const fn new(session_manager: Arc<SessionManager>) -> Self {
        Self { session_manager }
    }

    #[must_use]
    pub const fn session_manager(&self) -> &Arc<SessionManager> {
        &self.session_manager
    }

    /// Append `messages` to `transcript`, in order.
    ///
    /// With `save_immediately`, the transcript is saved after the whole batch
    /// is appended. A failed save returns [`ConversationError::Durability`];
    /// the appended messages stay in memory either way.
    pub fn update_session(
        &self,
        transcript: &Transcript,
        messages: &[AgentMessage],
        options: UpdateSessionOptions,
    ) -> Result<(), ConversationError> {
        for msg in messages {
            transcript.append(to_session_message(msg));
        }
        debug!(
            "Appended {} turn(s) to session {}",
            messages.len(),
            transcript.key()
        );

        if options.save_immediately {
            if let Err(e) = self.session_manager.save(transcript) {
                error!("Failed to save session {}: {e}", transcript.key());
                return Err(ConversationError::Durability(e));
            }
        }

        Ok(())
    }

    /// Look up (or start) the session for `key` and append `messages` to it.
    pub fn record_turns(
        &self,
        key: &str,
        messages: &[AgentMessage],
        options: UpdateSessionOptions,
    ) -> Result<Arc<Transcript>, ConversationError> {
        let transcript = self.session_manager.get_or_create(key)?;
        self.update_session(&transcript, messages, options)?;
        Ok(transcript)
    }
}

/// Convert one agent turn into a transcript message.
///
/// Text blocks are joined with newlines into `content`; the block structure
/// is not kept. Image blocks become inline media. Tool-call blocks are kept
/// only on assistant turns, and tool-result turns carry their call id and
/// tool name over from the turn metadata.
#[must_use]
pub fn to_session_message(msg: &AgentMessage) -> Message {
    let role = match msg.role {
        AgentRole::User => Role::User,
        AgentRole::Assistant => Role::Assistant,
        AgentRole::System => Role::System,
        AgentRole::ToolResult => Role::Tool,
    };

    let mut out = Message::new(role, extract_text_content(msg))
        .with_timestamp(extract_timestamp(msg))
        .with_media(extract_media(msg));

    match msg.role {
        AgentRole::Assistant => out.tool_calls = extract_tool_calls(msg),
        AgentRole::ToolResult => {
            out.tool_call_id = msg.metadata_str(TOOL_CALL_ID_KEY).map(str::to_string);
            if let Some(tool_name) = msg.metadata_str(TOOL_NAME_KEY) {
                out = out.with_metadata(TOOL_NAME_KEY, tool_name);
            }
        }
        AgentRole::User | AgentRole::System => {}
    }

    out
}

fn extract_text_content(msg: &AgentMessage) -> String {
    msg.content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn timestamps are milliseconds; transcripts keep whole seconds.
fn extract_timestamp(msg: &AgentMessage) -> DateTime<Utc> {
    (msg.timestamp > 0)
        .then(|| DateTime::from_timestamp(msg.timestamp / 1000, 0))
        .flatten()
        .unwrap_or_else(|| Utc::now().trunc_subsecs(0))
}

fn extract_media(msg: &AgentMessage) -> Vec<Media> {
    msg.content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Image { data, mime_type } => Some(Media {
                kind: "image".to_string(),
                url: String::new(),
                base64: Some(data.clone()),
                mime_type: mime_type.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn extract_tool_calls(msg: &AgentMessage) -> Vec<ToolCall> {
    msg.content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolCall {
                id,
                name,
                arguments,
            } => Some(ToolCall::new(id.as_str(), name.as_str()).with_params(arguments.clone())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn helper() -> (AgentHelper, TempDir) {
        let dir = TempDir::new().unwrap();
        let manager = SessionManager::new(dir.path()).unwrap();
        (AgentHelper::new(Arc::new(manager)), dir)
    }

    fn tool_round() -> Vec<AgentMessage> {
        let mut args = serde_json::Map::new();
        args.insert("cmd".to_string(), json!("date"));

        vec![
            AgentMessage::user("what time is it?"),
            AgentMessage::assistant(vec![
                ContentBlock::Thinking {
                    thinking: "need a shell".to_string(),
                },
                ContentBlock::text("Let me check."),
                ContentBlock::tool_call("call_1", "bash", args),
            ]),
            AgentMessage::tool_result("call_1", "bash", "12:00"),
            AgentMessage::assistant(vec![ContentBlock::text("It is"), ContentBlock::text("noon.")]),
        ]
    }

    #[test]
    fn test_text_blocks_are_flattened() {
        let msg = to_session_message(&AgentMessage::assistant(vec![
            ContentBlock::text("It is"),
            ContentBlock::Thinking {
                thinking: "hidden".to_string(),
            },
            ContentBlock::text("noon."),
        ]));

        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "It is\nnoon.");
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn test_assistant_tool_calls_are_extracted() {
        let msg = to_session_message(&tool_round()[1]);

        assert_eq!(msg.content, "Let me check.");
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].id, "call_1");
        assert_eq!(msg.tool_calls[0].name, "bash");
        assert_eq!(msg.tool_calls[0].params["cmd"], "date");
    }

    #[test]
    fn test_tool_calls_ignored_outside_assistant_turns() {
        let turn = AgentMessage::new(
            AgentRole::User,
            vec![ContentBlock::tool_call("x", "bash", serde_json::Map::new())],
        );
        assert!(to_session_message(&turn).tool_calls.is_empty());
    }

    #[test]
    fn test_tool_result_keeps_correlation() {
        let msg = to_session_message(&tool_round()[2]);

        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.content, "12:00");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.tool_name(), Some("bash"));
    }

    #[test]
    fn test_timestamp_is_truncated_to_seconds() {
        let turn = AgentMessage::user("hi").with_timestamp(1_714_557_600_987);
        let msg = to_session_message(&turn);
        assert_eq!(msg.timestamp.timestamp(), 1_714_557_600);
        assert_eq!(msg.timestamp.timestamp_subsec_nanos(), 0);

        let unstamped = to_session_message(&AgentMessage::user("hi").with_timestamp(0));
        assert!(unstamped.timestamp.timestamp() > 1_714_557_600);
    }

    #[test]
    fn test_image_blocks_become_media() {
        let turn = AgentMessage::new(
            AgentRole::User,
            vec![
                ContentBlock::text("look"),
                ContentBlock::Image {
                    data: "aGk=".to_string(),
                    mime_type: "image/jpeg".to_string(),
                },
            ],
        );
        let msg = to_session_message(&turn);

        assert_eq!(msg.content, "look");
        assert_eq!(msg.media.len(), 1);
        assert_eq!(msg.media[0].kind, "image");
        assert_eq!(msg.media[0].base64.as_deref(), Some("aGk="));
        assert_eq!(msg.media[0].mime_type, "image/jpeg");
    }

    #[test]
    fn test_update_session_appends_and_saves() {
        let (helper, _dir) = helper();
        let manager = helper.session_manager();
        let transcript = manager.get_or_create("telegram:7").unwrap();

        helper
            .update_session(&transcript, &tool_round(), UpdateSessionOptions::default())
            .unwrap();

        assert_eq!(transcript.len(), 4);
        let stored = clawgate_session::load("telegram:7", &manager.session_path("telegram:7"))
            .unwrap();
        assert_eq!(stored.snapshot(0), transcript.snapshot(0));

        let window = transcript.bounded_snapshot(2);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].tool_calls[0].id, "call_1");
    }

    #[test]
    fn test_update_session_in_memory_only() {
        let (helper, _dir) = helper();
        let transcript = helper
            .record_turns("k", &tool_round(), UpdateSessionOptions::in_memory())
            .unwrap();

        assert_eq!(transcript.len(), 4);
        assert!(!helper.session_manager().session_path("k").exists());
    }

    #[test]
    fn test_failed_save_keeps_appended_turns() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("sessions");
        let manager = Arc::new(SessionManager::new(&base).unwrap());
        let helper = AgentHelper::new(Arc::clone(&manager));
        let transcript = manager.get_or_create("k").unwrap();

        std::fs::remove_dir_all(&base).unwrap();
        let err = helper
            .update_session(&transcript, &tool_round(), UpdateSessionOptions::default())
            .unwrap_err();

        assert!(matches!(err, ConversationError::Durability(_)), "{err}");
        assert_eq!(transcript.len(), 4);

        std::fs::create_dir_all(&base).unwrap();
        manager.save(&transcript).unwrap();
        assert_eq!(manager.list().unwrap(), ["k"]);
    }
}
