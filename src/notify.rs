//! Webhook delivery.
//!
//! Chat webhooks take a JSON object with a single `text` field.  Anything
//! but `200 OK` counts as a failed delivery; the response body is kept in
//! the error because that is where chat services explain what they rejected.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::DeliveryError;

/// Sends one message to one webhook.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, url: &str, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
}

/// Posts messages with a shared [`reqwest::Client`].
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, url: &str, text: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(url)
            .json(&WebhookMessage { text })
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = %status, chars = text.chars().count(), "webhook accepted message");
        Ok(())
    }
}
