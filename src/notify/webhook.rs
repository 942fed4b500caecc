use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{AdminEvent, AdminNotifier};

/// POSTs each event as JSON to an administrator-facing webhook.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build webhook client")?;

        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl AdminNotifier for WebhookNotifier {
    async fn notify(&self, event: &AdminEvent) -> anyhow::Result<()> {
        debug!(url = %self.url, event = event.name(), "Posting admin notification");

        self.client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .with_context(|| format!("webhook request for {} failed", event.name()))?
            .error_for_status()
            .context("webhook rejected notification")?;

        Ok(())
    }
}
