//! Turn messages produced by the LLM-facing agent loop.
//!
//! A turn carries structured content blocks. The session store does not
//! keep these as-is; they are flattened into [`crate::Message`]s when a turn
//! is appended to a transcript.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Metadata, TOOL_CALL_ID_KEY, TOOL_NAME_KEY};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AgentRole {
    User,
    Assistant,
    System,
    ToolResult,
}

/// One structured piece of a turn's content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        /// Base64 payload.
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Thinking {
        thinking: String,
    },
    ToolCall {
        id: String,
        name: String,
        #[serde(default)]
        arguments: serde_json::Map<String, Value>,
    },
}

impl ContentBlock {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Map<String, Value>,
    ) -> Self {
        Self::ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// A single agent-level turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMessage {
    pub role: AgentRole,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Unix milliseconds; `0` when the producer did not stamp the turn.
    #[serde(default)]
    pub timestamp: i64,
    /// Correlation data; tool results carry `tool_call_id` and `tool_name`.
    #[serde(default)]
    pub metadata: Metadata,
}

impl AgentMessage {
    #[must_use]
    pub fn new(role: AgentRole, content: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content,
            timestamp: chrono::Utc::now().timestamp_millis(),
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(AgentRole::User, vec![ContentBlock::text(text)])
    }

    #[must_use]
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self::new(AgentRole::Assistant, content)
    }

    /// A tool-result turn answering `tool_call_id`.
    #[must_use]
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        let mut msg = Self::new(AgentRole::ToolResult, vec![ContentBlock::text(output)]);
        msg.metadata
            .insert(TOOL_CALL_ID_KEY.to_string(), Value::String(tool_call_id.into()));
        msg.metadata
            .insert(TOOL_NAME_KEY.to_string(), Value::String(tool_name.into()));
        msg
    }

    #[must_use]
    pub const fn with_timestamp(mut self, millis: i64) -> Self {
        self.timestamp = millis;
        self
    }

    /// Look up a string value in the turn metadata.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_block_tagging() {
        let block = ContentBlock::tool_call("t1", "bash", serde_json::Map::new());
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value, json!({"type": "toolCall", "id": "t1", "name": "bash", "arguments": {}}));

        let parsed: ContentBlock =
            serde_json::from_value(json!({"type": "text", "text": "hello"})).unwrap();
        assert_eq!(parsed, ContentBlock::text("hello"));
    }

    #[test]
    fn test_tool_result_carries_correlation() {
        let msg = AgentMessage::tool_result("t1", "bash", "done");
        assert_eq!(msg.role, AgentRole::ToolResult);
        assert_eq!(msg.metadata_str(TOOL_CALL_ID_KEY), Some("t1"));
        assert_eq!(msg.metadata_str(TOOL_NAME_KEY), Some("bash"));
    }

    #[test]
    fn test_role_names() {
        assert_eq!(
            serde_json::to_string(&AgentRole::ToolResult).unwrap(),
            "\"toolResult\""
        );
    }
}
