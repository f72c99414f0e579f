//! Conversation state: the message log and the exchange gate.
//!
//! These types carry no terminal or HTTP concerns; the TUI renders them and
//! the session mutates them.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Intent label used when the workflow does not classify its reply
pub const DEFAULT_INTENT: &str = "answer";

/// A single chat message. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// ISO-8601 string; server-provided values are kept verbatim
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default)]
    pub is_error: bool,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: now_timestamp(),
            intent: None,
            is_error: false,
        }
    }

    pub fn assistant(content: impl Into<String>, intent: impl Into<String>, timestamp: String) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp,
            intent: Some(intent.into()),
            is_error: false,
        }
    }

    /// Synthetic assistant message standing in for a failed exchange
    pub fn assistant_error(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: now_timestamp(),
            intent: None,
            is_error: true,
        }
    }
}

/// Current UTC time as an RFC 3339 string with millisecond precision
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Append-only message log. Insertion order is display order.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Request gate plus the banner text of the most recent failure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeState {
    pub pending: bool,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_has_no_assistant_metadata() {
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, ChatRole::User);
        assert_eq!(msg.intent, None);
        assert!(!msg.is_error);
        assert!(chrono::DateTime::parse_from_rfc3339(&msg.timestamp).is_ok());
    }

    #[test]
    fn test_error_message_is_flagged() {
        let msg = ChatMessage::assistant_error("oops");
        assert_eq!(msg.role, ChatRole::Assistant);
        assert!(msg.is_error);
    }

    #[test]
    fn test_conversation_preserves_insertion_order() {
        let mut conversation = Conversation::new();
        conversation.push(ChatMessage::user("first"));
        conversation.push(ChatMessage::assistant("second", DEFAULT_INTENT, now_timestamp()));
        conversation.push(ChatMessage::user("third"));

        let contents: Vec<&str> = conversation
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(conversation.last().map(|m| m.content.as_str()), Some("third"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
