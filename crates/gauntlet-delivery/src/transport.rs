use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Raw HTTP reply from a webhook, before adjudication.
#[derive(Debug, Clone)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

/// Transport-level failures: the webhook never produced an HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connect(String),
}

/// Outbound webhook seam. Tests substitute a scripted implementation so
/// adjudication logic never touches the network.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<TransportReply, TransportError>;
}

/// Production transport backed by a shared reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<TransportReply, TransportError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Connect(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(TransportReply { status, body })
    }
}
