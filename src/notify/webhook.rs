// src/notify/webhook.rs
use anyhow::{Context, Result};
use reqwest::Client;

use super::{NotificationEvent, Notifier};

pub const ENV_WEBHOOK_URL: &str = "BREAKING_WEBHOOK_URL";

/// Generic JSON webhook (Slack-compatible payload). Disabled when the
/// env var is unset.
pub struct WebhookNotifier {
    webhook_url: Option<String>,
    client: Client,
}

impl WebhookNotifier {
    pub fn from_env() -> Self {
        Self {
            webhook_url: std::env::var(ENV_WEBHOOK_URL).ok(),
            client: Client::new(),
        }
    }

    /// Explicit URL, for tests and tools.
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: Some(url),
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, event: &NotificationEvent) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!("webhook disabled (no BREAKING_WEBHOOK_URL)");
            return Ok(());
        };

        let text = format!(
            "*Breaking:* {}\n{} ({})\n@ {}",
            event.title,
            event.url,
            event.source,
            event.published_at.to_rfc3339()
        );
        let body = serde_json::json!({ "text": text });

        self.client
            .post(url)
            .json(&body)
            .send()
            .await
            .context("webhook post")?
            .error_for_status()
            .context("webhook non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
