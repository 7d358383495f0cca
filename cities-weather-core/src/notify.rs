use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::EtlError;

/// Operator channel for run outcomes.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    async fn notify(&self, text: &str) -> Result<(), EtlError>;
}

#[derive(Debug, Serialize)]
struct SlackPayload<'a> {
    text: &'a str,
    channel: &'a str,
}

/// Posts run outcomes to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackWebhookNotifier {
    webhook_url: String,
    channel: String,
    http: Client,
}

impl SlackWebhookNotifier {
    pub fn new(webhook_url: String, channel: String, timeout: Duration) -> Result<Self, EtlError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EtlError::Notification(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { webhook_url, channel, http })
    }
}

#[async_trait]
impl Notifier for SlackWebhookNotifier {
    async fn notify(&self, text: &str) -> Result<(), EtlError> {
        let payload = SlackPayload { text, channel: &self.channel };

        let res = self
            .http
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EtlError::Notification(format!("failed to call Slack webhook: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(EtlError::Notification(format!(
                "Slack webhook answered with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        Ok(())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}
