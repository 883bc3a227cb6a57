//! Bounded views over conversation history.
//!
//! A prompt builder only wants the most recent messages, but a tool result
//! without the assistant message that issued the call is meaningless to a
//! model, and so is an assistant message whose tool results were cut off.
//! The window here is always a suffix of the history that keeps such
//! tool-call groups whole, which means it can be longer than requested.

use clawgate_core::{Message, Role};
use std::collections::HashMap;

/// Index of the first message of the tool-call-safe window of at most
/// roughly `limit` messages.
///
/// `limit == 0` means no limit.
#[must_use]
pub fn window_start(messages: &[Message], limit: usize) -> usize {
    if limit == 0 || limit >= messages.len() {
        return 0;
    }

    let issuers = issuer_index(messages);
    let mut start = messages.len() - limit;
    while start > 0 {
        let msg = &messages[start];

        if msg.role == Role::Tool {
            if let Some(issuer) = issuers[start] {
                start = issuer;
                continue;
            }
            // Orphaned result: step past it and stop widening.
            start += 1;
            break;
        }

        if msg.has_tool_calls() && !results_present(messages, start) {
            start -= 1;
            continue;
        }

        break;
    }

    settle(messages, &issuers, start)
}

/// The tool-call-safe suffix of `messages` for `limit`.
#[must_use]
pub fn bounded_window(messages: &[Message], limit: usize) -> &[Message] {
    &messages[window_start(messages, limit)..]
}

/// Final pass over the chosen suffix: no leading orphaned results, and no
/// result whose issuing assistant exists but was left outside the window.
///
/// A pull-back always lands on an assistant message, so after the first
/// leading skip `start` only moves backward and the loop terminates.
fn settle(messages: &[Message], issuers: &[Option<usize>], mut start: usize) -> usize {
    loop {
        while start < messages.len()
            && messages[start].role == Role::Tool
            && issuers[start].is_none()
        {
            start += 1;
        }

        let separated = issuers[start..]
            .iter()
            .flatten()
            .copied()
            .find(|&issuer| issuer < start);
        if let Some(issuer) = separated {
            start = issuer;
            continue;
        }

        return start;
    }
}

/// For every tool message, the position of the closest earlier assistant
/// message that issued the call it answers. `None` for other messages and
/// for orphaned results.
fn issuer_index(messages: &[Message]) -> Vec<Option<usize>> {
    let mut last_issuer: HashMap<&str, usize> = HashMap::new();
    let mut issuers = Vec::with_capacity(messages.len());

    for (idx, msg) in messages.iter().enumerate() {
        issuers.push(
            msg.answered_call()
                .and_then(|call_id| last_issuer.get(call_id).copied()),
        );
        if msg.has_tool_calls() {
            for call in &msg.tool_calls {
                last_issuer.insert(call.id.as_str(), idx);
            }
        }
    }

    issuers
}

/// Whether every call of the assistant message at `idx` has a result after it.
fn results_present(messages: &[Message], idx: usize) -> bool {
    let later = &messages[idx + 1..];
    messages[idx]
        .tool_calls
        .iter()
        .all(|tc| later.iter().any(|m| m.answered_call() == Some(tc.id.as_str())))
}

/// Statistics about conversation history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub tool_messages: usize,
    pub tool_calls: usize,
    pub total_characters: usize,
    pub estimated_tokens: usize,
}

impl HistoryStats {
    #[must_use]
    pub fn of(history: &[Message]) -> Self {
        let count = |role: Role| history.iter().filter(|m| m.role == role).count();
        let total_characters: usize = history.iter().map(|m| m.content.len()).sum();

        Self {
            total_messages: history.len(),
            user_messages: count(Role::User),
            assistant_messages: count(Role::Assistant),
            tool_messages: count(Role::Tool),
            tool_calls: history.iter().map(|m| m.tool_calls.len()).sum(),
            total_characters,
            estimated_tokens: total_characters / 4, // Rough estimate: 4 chars per token
        }
    }
}
