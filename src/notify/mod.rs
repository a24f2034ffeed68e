//! Slack incoming-webhook delivery.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use wreq::Client;

/// Something that can deliver a text message - enables mocking.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, text: &str) -> Result<()>;
}

/// Posts `{"text": ...}` to a Slack incoming webhook.
pub struct SlackNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    /// With no webhook configured, messages are printed to stdout instead.
    pub fn new(webhook_url: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client, webhook_url })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn post(&self, text: &str) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            warn!("SLACK_WEBHOOK_URL not set, printing message instead");
            println!("{}", text);
            return Ok(());
        };

        let payload = serde_json::json!({ "text": text });
        debug!("POST Slack webhook ({} chars)", text.len());

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(payload.to_string())
            .send()
            .await
            .context("Failed to reach Slack webhook")?;

        let status = response.status();
        if status.as_u16() >= 300 {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Slack webhook failed with status {}: {}", status.as_u16(), body);
        }

        info!("Posted message to Slack");
        Ok(())
    }
}

/// Posts the message; on failure logs the error and prints the message so the
/// content is not lost.
pub async fn post_or_print(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.post(text).await {
        error!("Slack delivery failed: {:#}", e);
        println!("{}", text);
    }
}
