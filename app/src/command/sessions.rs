//! Session administration commands.

use clawgate_core::Message;
use clawgate_session::{HistoryStats, SessionManager};
use std::fmt::Write as _;
use tracing::info;

use super::init_common_components;

/// Input parameters for the Sessions command strategy.
#[derive(Debug, Clone)]
pub enum SessionsInput {
    /// List stored sessions.
    List,
    /// Create an empty session; a name is generated when none is given.
    New { name: Option<String> },
    /// Print a session's history.
    Show {
        key: String,
        /// Window size; the configured history limit when not given.
        limit: Option<usize>,
        /// Plain last-N cut instead of the tool-call-safe window.
        raw: bool,
        /// Print records as JSON lines.
        json: bool,
    },
    /// Drop all messages of a session, keeping its metadata.
    Clear { key: String },
    /// Remove a session from disk.
    Delete { key: String },
}

/// Strategy for inspecting and managing stored sessions.
#[derive(Debug, Clone, Copy)]
pub struct SessionsStrategy;

impl super::CommandStrategy for SessionsStrategy {
    type Input = SessionsInput;

    fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components()?;
        let sessions = &common.sessions;

        match input {
            SessionsInput::List => {
                let keys = sessions.list()?;
                if keys.is_empty() {
                    println!("No stored sessions in {}", sessions.base_dir().display());
                }
                for key in keys {
                    println!("{key}");
                }
            }
            SessionsInput::New { name } => {
                let name = name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(generate_session_name);
                sessions.create(&name)?;
                println!("✅ Created new session: {name}");
                println!("Session file: {}", sessions.session_path(&name).display());
            }
            SessionsInput::Show {
                key,
                limit,
                raw,
                json,
            } => {
                let limit = limit.unwrap_or(common.config.sessions.history_limit);
                show(sessions, &key, limit, raw, json)?;
            }
            SessionsInput::Clear { key } => {
                let dropped = clear(sessions, &key)?;
                println!("Cleared {dropped} message(s) from {key}");
            }
            SessionsInput::Delete { key } => {
                sessions.delete(&key)?;
                println!("Deleted session {key}");
            }
        }

        Ok(())
    }
}

fn ensure_known(sessions: &SessionManager, key: &str) -> anyhow::Result<()> {
    if !sessions.is_live(key) && !sessions.session_path(key).exists() {
        anyhow::bail!("No stored session named {key}");
    }
    Ok(())
}

/// Empty an existing session and save it. Returns the number of dropped
/// messages.
fn clear(sessions: &SessionManager, key: &str) -> anyhow::Result<usize> {
    ensure_known(sessions, key)?;

    let transcript = sessions.get_or_create(key)?;
    let dropped = transcript.len();
    transcript.clear();
    sessions.save(&transcript)?;
    info!("Cleared session {key}");
    Ok(dropped)
}

fn show(
    sessions: &SessionManager,
    key: &str,
    limit: usize,
    raw: bool,
    json: bool,
) -> anyhow::Result<()> {
    ensure_known(sessions, key)?;

    let transcript = sessions.get_or_create(key)?;
    let history = if raw {
        transcript.snapshot(limit)
    } else {
        transcript.bounded_snapshot(limit)
    };

    if json {
        for msg in &history {
            println!("{}", serde_json::to_string(msg)?);
        }
        return Ok(());
    }

    let stats = HistoryStats::of(&transcript.snapshot(0));
    println!("=== Session: {key} ===");
    println!(
        "Created: {}  Updated: {}",
        transcript.created_at().to_rfc3339(),
        transcript.updated_at().to_rfc3339()
    );
    println!(
        "Messages: {} ({} user, {} assistant, {} tool), ~{} tokens",
        stats.total_messages,
        stats.user_messages,
        stats.assistant_messages,
        stats.tool_messages,
        stats.estimated_tokens
    );
    println!("Showing {} message(s)\n", history.len());

    for msg in &history {
        println!("{}", format_message(msg));
    }
    Ok(())
}

/// One history entry as printed by `sessions show`.
fn format_message(msg: &Message) -> String {
    let mut out = format!(
        "[{}] {}: {}",
        msg.timestamp.format("%Y-%m-%d %H:%M:%S"),
        msg.role,
        msg.content
    );
    if let Some(call_id) = msg.answered_call() {
        let tool = msg.tool_name().unwrap_or("?");
        let _ = write!(out, "\n    ↳ result of {tool} ({call_id})");
    }
    for call in &msg.tool_calls {
        let _ = write!(
            out,
            "\n    → {}({}) [{}]",
            call.name,
            serde_json::Value::Object(call.params.clone()),
            call.id
        );
    }
    for media in &msg.media {
        let _ = write!(out, "\n    📎 {} {}", media.kind, media.mime_type);
    }
    out
}

fn generate_session_name() -> String {
    format!("session_{}", chrono::Utc::now().timestamp())
}
