//! Discord webhook notifications for reconciliation passes and the overdue
//! briefing.

use std::fmt;
use std::time::Duration;

use tracing::info;

mod payload;

pub use payload::{
    overdue_briefing, pass_alert, BotIdentity, Embed, EmbedField, Footer, WebhookPayload,
    COLOR_ORANGE, COLOR_RED, MAX_FIELDS,
};

#[derive(Debug)]
pub enum NotifyError {
    /// Network or transport failure.
    Transport(String),
    /// The webhook answered a non-success status.
    Api { status: u16, body: String },
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Transport(msg) => write!(f, "webhook transport error: {msg}"),
            NotifyError::Api { status, body } => {
                write!(f, "webhook rejected status={status}: {body}")
            }
        }
    }
}

impl std::error::Error for NotifyError {}

/// Posts payloads to one webhook URL. The URL is a credential; it is never
/// logged.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: reqwest::Client,
    webhook_url: String,
}

impl fmt::Debug for DiscordNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordNotifier")
            .field("webhook_url", &"<REDACTED>")
            .finish()
    }
}

impl DiscordNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            webhook_url,
        }
    }

    pub async fn send(&self, payload: &WebhookPayload) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            embeds = payload.embeds.len(),
            fields = payload.embeds.iter().map(|e| e.fields.len()).sum::<usize>(),
            "discord notification sent"
        );
        Ok(())
    }
}
