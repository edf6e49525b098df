//! Outbound send: `Send(handle, text) -> {messaging_product, to,
//! type:"text", text:{body}}`.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use jobsignal_core::JobSignalError;

/// Implemented by the concrete provider client. The Delivery Dispatcher and
/// Window Manager's reminder path depend only on this trait.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&self, handle: &str, text: &str) -> Result<(), JobSignalError>;
}

pub struct HttpChatSender {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpChatSender {
    pub fn new(base_url: String, access_token: String, timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            base_url,
            access_token,
        }
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    messaging_product: &'a str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    text: SendText<'a>,
}

#[derive(Serialize)]
struct SendText<'a> {
    body: &'a str,
}

#[async_trait]
impl ChatSender for HttpChatSender {
    /// Success = HTTP 2xx. 4xx surfaces as an error and is not retried by
    /// this call; 5xx/network failures are the caller's retry decision.
    async fn send(&self, handle: &str, text: &str) -> Result<(), JobSignalError> {
        let url = format!("{}/messages", self.base_url);
        debug!(handle = %handle, "sending outbound chat message");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&SendRequest {
                messaging_product: "whatsapp",
                to: handle,
                kind: "text",
                text: SendText { body: text },
            })
            .send()
            .await
            .map_err(|e| JobSignalError::ChatProvider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, body = %body, handle = %handle, "chat provider rejected send");
            return Err(JobSignalError::ChatProvider(format!("HTTP {status}: {body}")));
        }
        Ok(())
    }
}
