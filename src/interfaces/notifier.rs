use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config::NotificationSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Outbound channel for operator-facing messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, severity: Severity, message: &str) -> Result<()>;
}

/// Deliver a message and swallow delivery failures; a broken notifier must
/// never abort a workflow.
pub async fn notify_best_effort(notifier: &dyn Notifier, severity: Severity, message: &str) {
    if let Err(e) = notifier.notify(severity, message).await {
        warn!("Failed to deliver {} notification: {}", severity, e);
    }
}

/// Used when notifications are disabled.
pub struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn notify(&self, severity: Severity, message: &str) -> Result<()> {
        info!("Notifications disabled, not sending {}: {}", severity, message);
        Ok(())
    }
}

pub struct DiscordWebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(30);

impl DiscordWebhookNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }

    async fn post(&self, payload: &serde_json::Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await?)
    }
}

fn embed_style(severity: Severity) -> (&'static str, u32) {
    match severity {
        Severity::Error => ("❌ DCS Persistence Error", 0xD32F2F),
        Severity::Warning => ("⚠️ Warning", 0xFFA000),
        Severity::Info => ("ℹ️ Info", 0x2196F3),
    }
}

pub(crate) fn embed_payload(severity: Severity, message: &str, timestamp: &str) -> serde_json::Value {
    let (title, color) = embed_style(severity);
    serde_json::json!({
        "embeds": [{
            "title": title,
            "description": format!("{}\n\n**Time:** {}", message, timestamp),
            "color": color,
        }]
    })
}

#[async_trait]
impl Notifier for DiscordWebhookNotifier {
    async fn notify(&self, severity: Severity, message: &str) -> Result<()> {
        info!("Sending {} notification to Discord...", severity);
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let payload = embed_payload(severity, message, &timestamp);

        let mut resp = self.post(&payload).await?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let wait = body
                .get("retry_after")
                .and_then(|v| v.as_f64())
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or(Duration::from_secs(1))
                .min(MAX_RATE_LIMIT_WAIT);
            warn!("Discord rate limited, retrying in {:?}", wait);
            tokio::time::sleep(wait).await;
            resp = self.post(&payload).await?;
        }

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(anyhow!("Discord webhook error ({}): {}", status, body))
        }
    }
}

/// Build the notifier described by the configuration.
pub fn from_settings(settings: &NotificationSettings) -> Arc<dyn Notifier> {
    if !settings.send_errors_to_discord {
        info!("Discord notifications disabled.");
        return Arc::new(SilentNotifier);
    }
    let url = settings.error_discord_webhook.trim();
    if url.is_empty() {
        warn!("Discord notifications enabled but webhook URL missing.");
        return Arc::new(SilentNotifier);
    }
    match DiscordWebhookNotifier::new(url) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            warn!("Could not build Discord client, notifications disabled: {}", e);
            Arc::new(SilentNotifier)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Captures every message; optionally fails each delivery afterwards.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(Severity, String)>>,
        pub fail: bool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn messages(&self) -> Vec<(Severity, String)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn count(&self, severity: Severity) -> usize {
            self.messages().iter().filter(|(s, _)| *s == severity).count()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, severity: Severity, message: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((severity, message.to_string()));
            if self.fail {
                Err(anyhow!("webhook unreachable"))
            } else {
                Ok(())
            }
        }
    }
}
