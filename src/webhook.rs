use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Failures that end an exchange without a usable reply body
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Connection refused, DNS failure, timeout and the like.
    #[error("Failed to connect to the server: {0}")]
    Transport(#[from] reqwest::Error),

    /// The webhook answered with a non-success status.
    #[error("Server error: {}", .0.as_u16())]
    Status(StatusCode),

    /// The body was not valid JSON.
    #[error("Invalid response from server: {0}")]
    Decode(#[from] serde_json::Error),

    /// The background task running the request panicked or was dropped.
    #[error("Request was interrupted: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

#[derive(Serialize)]
struct WebhookRequest<'a> {
    message: &'a str,
    user_id: &'a str,
}

/// Client for a single workflow webhook
#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    endpoint: String,
    user_id: String,
}

impl WebhookClient {
    pub fn new(endpoint: &str, user_id: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            user_id: user_id.to_string(),
        }
    }

    /// Like [`WebhookClient::new`] but with a transport timeout
    pub fn with_timeout(endpoint: &str, user_id: &str, timeout: Duration) -> Result<Self, ExchangeError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            user_id: user_id.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// POST one message and return the parsed response body.
    ///
    /// The body shape is not interpreted here; see [`crate::normalize`].
    pub async fn send(&self, message: &str) -> Result<Value, ExchangeError> {
        let request = WebhookRequest {
            message,
            user_id: &self.user_id,
        };

        debug!(endpoint = %self.endpoint, chars = message.chars().count(), "dispatching message");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "webhook returned error status");
            return Err(ExchangeError::Status(status));
        }

        let body = response.bytes().await?;
        let data: Value = serde_json::from_slice(&body)?;
        debug!(bytes = body.len(), "webhook response parsed");

        Ok(data)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};

    /// Serve `app` on an ephemeral local port and return its base URL
    pub(crate) async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_send_posts_message_and_user_id() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let app = Router::new().route(
            "/webhook/support",
            post(move |Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    *captured.lock().unwrap() = Some(body);
                    Json(serde_json::json!({"answer": "ok"}))
                }
            }),
        );
        let base = serve(app).await;

        let client = WebhookClient::new(&format!("{}/webhook/support", base), "customer1");
        let data = client.send("Where is my order?").await.unwrap();

        assert_eq!(data, serde_json::json!({"answer": "ok"}));
        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body, serde_json::json!({"message": "Where is my order?", "user_id": "customer1"}));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let app = Router::new().route(
            "/hook",
            post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"answer": "ignored"}))) }),
        );
        let base = serve(app).await;

        let client = WebhookClient::new(&format!("{}/hook", base), "u");
        let err = client.send("hi").await.unwrap_err();

        assert!(matches!(err, ExchangeError::Status(s) if s.as_u16() == 500));
        assert_eq!(err.to_string(), "Server error: 500");
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let app = Router::new().route("/hook", post(|| async { "<html>not json</html>" }));
        let base = serve(app).await;

        let client = WebhookClient::new(&format!("{}/hook", base), "u");
        let err = client.send("hi").await.unwrap_err();

        assert!(matches!(err, ExchangeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = WebhookClient::new(&format!("http://{}/hook", addr), "u");
        let err = client.send("hi").await.unwrap_err();

        assert!(matches!(err, ExchangeError::Transport(_)));
    }
}
