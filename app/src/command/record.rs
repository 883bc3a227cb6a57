use anyhow::Context;
use clawgate_conversation::{AgentHelper, UpdateSessionOptions};
use clawgate_core::AgentMessage;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::init_common_components;

/// Input parameters for the Record command strategy.
#[derive(Debug, Clone)]
pub struct RecordInput {
    /// Session to append to; created when it does not exist yet.
    pub key: String,
    /// JSON-lines file of agent turns; stdin when not given.
    pub file: Option<PathBuf>,
    /// Keep the turns in memory only, overriding `sessions.save_immediately`.
    pub no_save: bool,
}

/// Strategy for appending agent turns to a session.
///
/// Reads a stream of agent messages, converts them to transcript messages
/// and records them the same way an agent worker does after each turn.
#[derive(Debug, Clone, Copy)]
pub struct RecordStrategy;

impl super::CommandStrategy for RecordStrategy {
    type Input = RecordInput;

    fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components()?;
        let options = UpdateSessionOptions {
            save_immediately: common.config.sessions.save_immediately && !input.no_save,
        };

        let turns = match &input.file {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                read_turns(BufReader::new(file))
                    .with_context(|| format!("Invalid agent turns in {}", path.display()))?
            }
            None => read_turns(io::stdin().lock()).context("Invalid agent turns on stdin")?,
        };

        let helper = AgentHelper::new(Arc::new(common.sessions));
        let transcript = helper.record_turns(&input.key, &turns, options)?;

        info!(
            "Recorded {} turn(s) into {} ({} message(s) total)",
            turns.len(),
            input.key,
            transcript.len()
        );
        if options.save_immediately {
            println!(
                "Recorded {} turn(s) into {}",
                turns.len(),
                helper.session_manager().session_path(&input.key).display()
            );
        } else {
            println!("Recorded {} turn(s) without saving", turns.len());
        }

        Ok(())
    }
}

/// Whitespace-separated JSON agent messages, usually one per line.
fn read_turns(reader: impl Read) -> serde_json::Result<Vec<AgentMessage>> {
    serde_json::Deserializer::from_reader(reader)
        .into_iter::<AgentMessage>()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawgate_core::{AgentRole, ContentBlock};

    #[test]
    fn test_read_turns_stream() {
        let input = concat!(
            r#"{"role":"user","content":[{"type":"text","text":"hi"}],"timestamp":1714557600000}"#,
            "\n",
            r#"{"role":"toolResult","content":[{"type":"text","text":"ok"}],"timestamp":1714557601000,"metadata":{"tool_call_id":"t1","tool_name":"bash"}}"#,
            "\n"
        );

        let turns = read_turns(input.as_bytes()).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, AgentRole::User);
        assert_eq!(turns[0].content, vec![ContentBlock::text("hi")]);
        assert_eq!(turns[1].role, AgentRole::ToolResult);
        assert_eq!(turns[1].metadata_str("tool_call_id"), Some("t1"));
    }

    #[test]
    fn test_read_turns_rejects_garbage() {
        assert!(read_turns("{\"role\":\"user\"".as_bytes()).is_err());
        assert!(read_turns("".as_bytes()).unwrap().is_empty());
    }
}
