//! Message and Exchange domain types.
//!
//! A `Message` is what travels to the inference service; an `Exchange` is
//! what the history remembers once a turn has completed.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged message sent to the inference service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// One completed turn: what the user said and what the assistant replied.
///
/// Fields are private so an exchange cannot change after it is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    user_message: String,
    assistant_reply: String,
}

impl Exchange {
    pub fn new(user_message: impl Into<String>, assistant_reply: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            assistant_reply: assistant_reply.into(),
        }
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn assistant_reply(&self) -> &str {
        &self.assistant_reply
    }

    /// The two messages this exchange contributes to a request, in order.
    pub fn to_messages(&self) -> [Message; 2] {
        [
            Message::user(self.user_message.clone()),
            Message::assistant(self.assistant_reply.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, model!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, model!");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::system("be brief")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"be brief"}"#);
    }

    #[test]
    fn exchange_expands_to_user_then_assistant() {
        let exchange = Exchange::new("Hello", "Hi there");
        let [user, assistant] = exchange.to_messages();
        assert_eq!(user, Message::user("Hello"));
        assert_eq!(assistant, Message::assistant("Hi there"));
    }

    #[test]
    fn exchange_accepts_empty_text() {
        let exchange = Exchange::new("", "");
        assert_eq!(exchange.user_message(), "");
        assert_eq!(exchange.assistant_reply(), "");
    }
}
