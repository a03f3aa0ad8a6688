use crate::error::{DigestError, Result};
use crate::slack::blocks::Block;
use crate::slack::digest::Digest;
use crate::slack::MessageSink;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Slack incoming webhook
pub struct SlackWebhook {
    webhook_url: String,
    client: Client,
}

impl SlackWebhook {
    pub fn new(webhook_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { webhook_url, client })
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
    blocks: &'a [Block],
}

impl<'a> From<&'a Digest> for WebhookPayload<'a> {
    fn from(digest: &'a Digest) -> Self {
        Self {
            text: &digest.fallback_text,
            blocks: &digest.blocks,
        }
    }
}

#[async_trait]
impl MessageSink for SlackWebhook {
    async fn send(&self, digest: &Digest) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookPayload::from(digest))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DigestError::slack(format!(
                "webhook rejected message with status {}: {}",
                status, error_text
            )));
        }

        tracing::info!(blocks = digest.blocks.len(), "Digest delivered to Slack");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let digest = Digest {
            fallback_text: "Metrics digest".to_string(),
            blocks: vec![Block::section("hello"), Block::Divider],
        };

        let payload = serde_json::to_value(WebhookPayload::from(&digest)).unwrap();
        assert_eq!(payload["text"], "Metrics digest");
        assert_eq!(payload["blocks"].as_array().unwrap().len(), 2);
        assert_eq!(payload["blocks"][1]["type"], "divider");
    }

    #[test]
    fn test_webhook_creation() {
        let webhook =
            SlackWebhook::new("https://hooks.slack.com/services/T/B/X".to_string()).unwrap();
        assert_eq!(webhook.webhook_url, "https://hooks.slack.com/services/T/B/X");
    }
}
