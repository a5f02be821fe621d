//! Conversation assembly.
//!
//! Builds the message list for one request:
//!
//! 1. **System** directive, when a non-empty one is given
//! 2. **History**, the last `max_history` exchanges as user/assistant pairs
//! 3. **New message** from the user
//!
//! Message content is passed through untouched; empty strings are allowed.

use std::sync::Arc;

use lightlocal_core::message::{Exchange, Message};
use lightlocal_memory::HistoryStore;

/// Reads the history tail and lays out a request's messages.
#[derive(Debug, Clone)]
pub struct ConversationAssembler {
    history: Arc<HistoryStore>,
    max_history: usize,
}

impl ConversationAssembler {
    pub fn new(history: Arc<HistoryStore>, max_history: usize) -> Self {
        Self {
            history,
            max_history,
        }
    }

    /// Assemble the messages for `new_message` against the current history.
    pub fn assemble(&self, new_message: &str, system_prompt: Option<&str>) -> Vec<Message> {
        let recent = self.history.snapshot_tail(self.max_history);
        build_messages(system_prompt, &recent, new_message)
    }
}

/// Lay out system prompt, past exchanges, and the new message in order.
pub fn build_messages(
    system_prompt: Option<&str>,
    exchanges: &[Exchange],
    new_message: &str,
) -> Vec<Message> {
    let system = system_prompt.filter(|s| !s.is_empty());

    let mut messages = Vec::with_capacity(system.is_some() as usize + exchanges.len() * 2 + 1);
    if let Some(prompt) = system {
        messages.push(Message::system(prompt));
    }
    for exchange in exchanges {
        messages.extend(exchange.to_messages());
    }
    messages.push(Message::user(new_message));
    messages
}
