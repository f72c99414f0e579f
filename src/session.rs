//! The send/await/normalize/append lifecycle of one chat exchange.
//!
//! An exchange is split in two so the network call can run on a background
//! task: [`ChatSession::submit`] validates input and opens the gate, the
//! caller runs the request, and [`ChatSession::complete`] applies the result.

use serde_json::Value;
use tracing::{info, warn};

use crate::conversation::{ChatMessage, Conversation, ExchangeState};
use crate::normalize::normalize_reply;
use crate::webhook::{ExchangeError, WebhookClient};

/// Shown in the conversation when an exchange fails
pub const ERROR_REPLY: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

#[derive(Debug, Default)]
pub struct ChatSession {
    conversation: Conversation,
    state: ExchangeState,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            conversation: Conversation::new(),
            state: ExchangeState::default(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending
    }

    pub fn last_error(&self) -> Option<&str> {
        self.state.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.state.last_error = None;
    }

    /// Accept the input buffer as the next user message.
    ///
    /// Returns the trimmed message to send, or `None` when the input is blank
    /// or an exchange is already pending (nothing changes in that case).
    /// On acceptance the buffer is cleared.
    pub fn submit(&mut self, input: &mut String) -> Option<String> {
        let message = input.trim();
        if message.is_empty() || self.state.pending {
            return None;
        }
        let message = message.to_string();

        self.state.last_error = None;
        self.conversation.push(ChatMessage::user(message.clone()));
        input.clear();
        self.state.pending = true;

        Some(message)
    }

    /// Apply the outcome of the request started by the last accepted submit
    pub fn complete(&mut self, result: Result<Value, ExchangeError>) {
        match result {
            Ok(data) => {
                let reply = normalize_reply(&data);
                info!(intent = %reply.intent, chars = reply.content.chars().count(), "reply received");
                self.conversation
                    .push(ChatMessage::assistant(reply.content, reply.intent, reply.timestamp));
            }
            Err(err) => {
                warn!(error = %err, "exchange failed");
                self.state.last_error = Some(err.to_string());
                self.conversation.push(ChatMessage::assistant_error(ERROR_REPLY));
            }
        }
        self.state.pending = false;
    }

    /// Run a whole exchange inline. Returns false if the input was not accepted.
    pub async fn send(&mut self, client: &WebhookClient, input: &mut String) -> bool {
        let Some(message) = self.submit(input) else {
            return false;
        };
        let result = client.send(&message).await;
        self.complete(result);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ChatRole;
    use crate::normalize::DEFAULT_REPLY;
    use crate::webhook::tests::serve;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use reqwest::StatusCode as ReqwestStatus;
    use serde_json::json;

    #[test]
    fn test_whitespace_input_is_ignored() {
        let mut session = ChatSession::new();
        for raw in ["", "   ", "\n\t  \r\n"] {
            let mut input = raw.to_string();
            assert_eq!(session.submit(&mut input), None);
            assert_eq!(input, raw);
        }
        assert!(session.conversation().is_empty());
        assert!(!session.is_pending());
    }

    #[test]
    fn test_submit_while_pending_is_ignored() {
        let mut session = ChatSession::new();
        let mut input = "first".to_string();
        assert_eq!(session.submit(&mut input).as_deref(), Some("first"));
        assert!(session.is_pending());

        let mut input = "second".to_string();
        assert_eq!(session.submit(&mut input), None);
        assert_eq!(input, "second");
        assert_eq!(session.conversation().len(), 1);
        assert!(session.is_pending());
    }

    #[test]
    fn test_submit_trims_and_clears_input() {
        let mut session = ChatSession::new();
        session.state.last_error = Some("old failure".to_string());

        let mut input = "  hello there \n".to_string();
        assert_eq!(session.submit(&mut input).as_deref(), Some("hello there"));
        assert!(input.is_empty());
        assert_eq!(session.last_error(), None);

        let msg = session.conversation().last().unwrap();
        assert_eq!(msg.role, ChatRole::User);
        assert_eq!(msg.content, "hello there");
    }

    #[test]
    fn test_failed_exchange_appends_error_message() {
        let mut session = ChatSession::new();
        let mut input = "hi".to_string();
        session.submit(&mut input);

        session.complete(Err(ExchangeError::Status(ReqwestStatus::BAD_GATEWAY)));

        assert!(!session.is_pending());
        assert_eq!(session.last_error(), Some("Server error: 502"));
        assert_eq!(session.conversation().len(), 2);
        let msg = session.conversation().last().unwrap();
        assert_eq!(msg.role, ChatRole::Assistant);
        assert!(msg.is_error);
        assert_eq!(msg.content, ERROR_REPLY);
    }

    #[test]
    fn test_unrecognized_shape_is_not_an_error() {
        let mut session = ChatSession::new();
        let mut input = "hi".to_string();
        session.submit(&mut input);

        session.complete(Ok(json!({"status": "queued"})));

        assert!(!session.is_pending());
        assert_eq!(session.last_error(), None);
        let msg = session.conversation().last().unwrap();
        assert!(!msg.is_error);
        assert_eq!(msg.content, DEFAULT_REPLY);
    }

    #[test]
    fn test_gate_reopens_after_completion() {
        let mut session = ChatSession::new();
        let mut input = "one".to_string();
        session.submit(&mut input);
        session.complete(Ok(json!("reply")));

        let mut input = "two".to_string();
        assert_eq!(session.submit(&mut input).as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_order_support_scenario() {
        let app = Router::new().route(
            "/webhook/customer-support",
            post(|| async {
                Json(json!({"answer": "Sure, what's your order number?", "intent": "order_support"}))
            }),
        );
        let base = serve(app).await;
        let client = WebhookClient::new(&format!("{}/webhook/customer-support", base), "customer1");

        let mut session = ChatSession::new();
        let mut input = "I need help".to_string();
        assert!(session.send(&client, &mut input).await);

        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "I need help");
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[1].content, "Sure, what's your order number?");
        assert_eq!(messages[1].intent.as_deref(), Some("order_support"));
        assert!(!messages[1].is_error);
        assert!(!session.is_pending());
        assert_eq!(session.last_error(), None);
    }

    #[tokio::test]
    async fn test_server_error_scenario() {
        let app = Router::new().route(
            "/hook",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "workflow inactive") }),
        );
        let base = serve(app).await;
        let client = WebhookClient::new(&format!("{}/hook", base), "customer1");

        let mut session = ChatSession::new();
        let mut input = "hello".to_string();
        assert!(session.send(&client, &mut input).await);

        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_error);
        assert_eq!(messages[1].content, ERROR_REPLY);
        assert_eq!(session.last_error(), Some("Server error: 503"));
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn test_blank_send_skips_network() {
        let client = WebhookClient::new("http://127.0.0.1:9/never", "customer1");
        let mut session = ChatSession::new();
        let mut input = "   ".to_string();
        assert!(!session.send(&client, &mut input).await);
        assert!(session.conversation().is_empty());
    }
}
