use crate::http::{build_client, transport_error};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use sedar_core::{ApiError, Notifier};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const ALERT_TITLE: &str = "Suspicious activity detected by Sedar.";
pub const ALERT_COLOR: u32 = 0x5046e4;
pub const ALERT_FOOTER: &str = "Powered by Sedar 1";

/// Posts alerts as embeds to a Discord webhook.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            webhook_url,
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, instance_id: &str, reason: &str) -> Result<(), ApiError> {
        let url = match self.webhook_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => return Err(ApiError::MissingBaseUrl("discord webhook")),
        };

        let payload = build_alert_payload(instance_id, reason, Utc::now());
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        debug!("Webhook accepted alert for {} ({})", instance_id, status);
        Ok(())
    }
}

/// Webhook body for one alert.
pub fn build_alert_payload(instance_id: &str, reason: &str, at: DateTime<Utc>) -> Value {
    let container = if instance_id.is_empty() {
        "Unknown"
    } else {
        instance_id
    };

    json!({
        "embeds": [{
            "title": ALERT_TITLE,
            "color": ALERT_COLOR,
            "fields": [
                { "name": "Container", "value": container, "inline": false },
                { "name": "Reason", "value": reason }
            ],
            "timestamp": at.to_rfc3339_opts(SecondsFormat::Millis, true),
            "footer": { "text": ALERT_FOOTER }
        }]
    })
}
