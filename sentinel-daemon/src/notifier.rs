//! Discord webhook dispatch
//!
//! Posts approved alerts as embeds. `?wait=true` makes Discord return
//! 200 + JSON instead of 204 No Content, which keeps response handling
//! uniform. The engine treats every failure here as retryable and moves on.

use async_trait::async_trait;
use sentinel_core::notify::{AlertPayload, Notifier, NotifyError};
use sentinel_core::rules::Severity;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

const NEUTRAL_DARK: u32 = 0x2B3137;
const AMBER: u32 = 0xE67E22;
const RED: u32 = 0xE74C3C;

/// Webhook-based Discord notifier.
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(12))
                .build()
                .unwrap_or_default(),
            webhook_url: webhook_url.into(),
        }
    }

    fn color(severity: Severity) -> u32 {
        match severity {
            Severity::Info => NEUTRAL_DARK,
            Severity::Warning => AMBER,
            Severity::Critical => RED,
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        let body = json!({
            "embeds": [{
                "title": payload.title.chars().take(256).collect::<String>(),
                "description": payload.body.chars().take(4096).collect::<String>(),
                "color": Self::color(payload.severity),
                "timestamp": payload.timestamp.to_rfc3339(),
            }]
        });
        let response = self
            .client
            .post(format!("{}?wait=true", self.webhook_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError(format!("webhook post: {e}")))?;
        if !response.status().is_success() {
            return Err(NotifyError(format!(
                "webhook status {}",
                response.status()
            )));
        }
        debug!(title = %payload.title, "alert dispatched");
        Ok(())
    }
}

/// Log-only notifier for dry runs and setups without a webhook.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        info!(title = %payload.title, body = %payload.body, "alert (no webhook configured)");
        Ok(())
    }
}
