#![deny(
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

//! Shared message model for the gateway.
//!
//! `Message` is what a conversation transcript stores. The `agent` module
//! holds the turn representation produced by the LLM-facing agent loop,
//! which is adapted into `Message`s before it is stored.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub mod agent;

pub use agent::{AgentMessage, AgentRole, ContentBlock};

/// Open key/value data attached to messages and conversations.
///
/// Keys are kept sorted so that serializing the same map always produces the
/// same bytes. Well-known keys: [`TOOL_NAME_KEY`] on tool messages; any other
/// key is passed through untouched.
pub type Metadata = BTreeMap<String, Value>;

/// Metadata key carrying the name of the tool that produced a tool message.
pub const TOOL_NAME_KEY: &str = "tool_name";

/// Metadata key carrying the id of the tool call a result answers.
pub const TOOL_CALL_ID_KEY: &str = "tool_call_id";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attachment carried alongside a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Media {
    /// image, video, audio, document
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    /// Inline payload, used when there is no URL to point at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(rename = "mimetype", default)]
    pub mime_type: String,
}

/// A tool invocation issued by an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,
}

impl ToolCall {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            params: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: serde_json::Map<String, Value>) -> Self {
        self.params = params;
        self
    }
}

/// One entry of a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// Set on tool messages only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Set on assistant messages that invoked tools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    /// Create a message stamped with the current time, truncated to seconds.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            media: Vec::new(),
            timestamp: Utc::now().trunc_subsecs(0),
            metadata: Metadata::new(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a tool message answering the call `tool_call_id`.
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    #[must_use]
    pub fn with_media(mut self, media: Vec<Media>) -> Self {
        self.media = media;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether this is an assistant message that invoked at least one tool.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }

    /// Whether this assistant message issued the call with the given id.
    #[must_use]
    pub fn issued_call(&self, call_id: &str) -> bool {
        self.has_tool_calls() && self.tool_calls.iter().any(|tc| tc.id == call_id)
    }

    /// The call id this message answers, if it is a tool message.
    #[must_use]
    pub fn answered_call(&self) -> Option<&str> {
        if self.role == Role::Tool {
            self.tool_call_id.as_deref()
        } else {
            None
        }
    }

    /// The `tool_name` hint recorded on a tool message.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        self.metadata.get(TOOL_NAME_KEY).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"assistant\"").unwrap(),
            Role::Assistant
        );
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn test_message_omits_empty_optional_fields() {
        let msg = Message::user("hi");
        let value = serde_json::to_value(&msg).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj["role"], "user");
        assert_eq!(obj["content"], "hi");
        assert!(obj.contains_key("timestamp"));
        for absent in ["media", "metadata", "tool_call_id", "tool_calls"] {
            assert!(!obj.contains_key(absent), "{absent} should be omitted");
        }
    }

    #[test]
    fn test_message_timestamp_has_second_resolution() {
        let msg = Message::system("boot");
        assert_eq!(msg.timestamp.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_tool_call_wire_shape() {
        let mut params = serde_json::Map::new();
        params.insert("path".to_string(), json!("/tmp"));
        let msg = Message::assistant("")
            .with_tool_calls(vec![ToolCall::new("t1", "read_file").with_params(params)]);

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value["tool_calls"],
            json!([{"id": "t1", "name": "read_file", "params": {"path": "/tmp"}}])
        );
        assert!(msg.has_tool_calls());
        assert!(msg.issued_call("t1"));
        assert!(!msg.issued_call("t2"));
    }

    #[test]
    fn test_tool_message_accessors() {
        let msg = Message::tool("t1", "ok").with_metadata(TOOL_NAME_KEY, "bash");
        assert_eq!(msg.answered_call(), Some("t1"));
        assert_eq!(msg.tool_name(), Some("bash"));
        assert_eq!(Message::user("x").answered_call(), None);
    }

    #[test]
    fn test_media_field_names() {
        let media = Media {
            kind: "image".to_string(),
            url: String::new(),
            base64: Some("aGk=".to_string()),
            mime_type: "image/png".to_string(),
        };
        let value = serde_json::to_value(&media).unwrap();
        assert_eq!(value["type"], "image");
        assert_eq!(value["mimetype"], "image/png");
        assert_eq!(value["base64"], "aGk=");
    }
}
