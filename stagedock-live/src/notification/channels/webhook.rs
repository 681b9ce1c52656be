//! Generic webhook notification channel.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use stagedock_platforms::http::{DEFAULT_MAX_REDIRECTS, create_client_builder};
use tracing::{debug, warn};

use crate::Result;
use crate::notification::{Notifier, went_live_text};

/// Webhook channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Webhook URL.
    pub url: String,
    /// Custom headers.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Posts a JSON payload per notification.
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    /// Create a new webhook channel.
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let client =
            create_client_builder(Duration::from_secs(config.timeout_secs), DEFAULT_MAX_REDIRECTS)
                .build()
                .map_err(|e| {
                    crate::Error::notification(format!("Failed to build webhook client: {}", e))
                })?;

        Ok(Self { config, client })
    }

    /// Build the request headers. Invalid pairs are skipped.
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for (name, value) in &self.config.headers {
            if let (Ok(name), Ok(value)) = (name.parse::<HeaderName>(), value.parse::<HeaderValue>())
            {
                headers.insert(name, value);
            }
        }

        headers
    }

    /// Build the JSON payload.
    fn build_payload(
        &self,
        display_name: &str,
        platform_label: &str,
        url: &str,
    ) -> serde_json::Value {
        let (title, description) = went_live_text(display_name, platform_label);
        json!({
            "event_type": "went_live",
            "title": title,
            "description": description,
            "display_name": display_name,
            "platform": platform_label,
            "url": url,
            "timestamp": Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn channel_type(&self) -> &'static str {
        "webhook"
    }

    async fn notify_went_live(
        &self,
        display_name: &str,
        platform_label: &str,
        url: &str,
    ) -> Result<()> {
        let payload = self.build_payload(display_name, platform_label, url);

        let response = self
            .client
            .post(&self.config.url)
            .headers(self.build_headers())
            .json(&payload)
            .send()
            .await
            .map_err(|e| crate::Error::notification(format!("Webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Webhook failed");
            return Err(crate::Error::notification(format!(
                "Webhook failed: {} - {}",
                status, body
            )));
        }

        debug!(display_name, "Webhook notification sent");
        Ok(())
    }
}
