//! Notification dispatch boundary.
//!
//! Delivery is best-effort with no retry: a failed send is logged by the
//! loop and dropped for that cycle. The default implementation relays the
//! rendered alert to a webhook (e.g., an email gateway or chat hook) as a
//! JSON `{recipient, subject, body}` document.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::PipelineError;

// ---

#[async_trait]
pub trait Notifier: Send {
    async fn send(&self, subject: &str, body: &str) -> Result<(), PipelineError>;
}

/// Request body posted to the webhook endpoint.
#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    // ---
    recipient: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Relays alerts over HTTP POST.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    recipient: String,
}

impl WebhookNotifier {
    // ---
    pub fn new(url: String, recipient: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            recipient,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), PipelineError> {
        // ---
        let message = WebhookMessage {
            recipient: &self.recipient,
            subject,
            body,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&message)
            .send()
            .await
            .map_err(|e| PipelineError::DeliveryFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::DeliveryFailure(format!(
                "webhook returned status {}",
                response.status()
            )));
        }

        info!("Alert delivered to {}: {}", self.recipient, subject);
        Ok(())
    }
}
