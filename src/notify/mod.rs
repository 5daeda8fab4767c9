// =============================================================================
// Alert Notifier — Telegram Bot API
// =============================================================================
//
// Delivery is fire-and-forget: the refresh cycle logs a failed send and moves
// on, and the alert de-duplication state advances whether or not the message
// made it out.  Each cycle naturally retries by re-evaluating the signal.
//
// SECURITY: the bot token is part of the request URL; it is never logged and
// the Debug impl redacts it.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Destination for alert texts. Object-safe so the refresh cycle and tests
/// can inject their own implementation.
#[async_trait]
pub trait Notify: Send + Sync {
    /// Deliver one human-readable alert. An `Err` means delivery failed; the
    /// caller decides whether that matters (the monitor swallows it).
    async fn send(&self, text: &str) -> Result<()>;
}

/// Telegram Bot API client for a single chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    /// Create a notifier with a short timeout so a slow Telegram API cannot
    /// stall the refresh cycle.
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("failed to build reqwest client");

        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            base_url: "https://api.telegram.org".to_string(),
            client,
        }
    }

    /// Build a notifier from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`.
    ///
    /// Missing credentials are a fatal startup error: the monitor exists to
    /// alert, so it refuses to run without a destination.
    pub fn from_env() -> Result<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN is not set; configure the Telegram bot credentials before starting")?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .context("TELEGRAM_CHAT_ID is not set; configure the Telegram bot credentials before starting")?;

        if bot_token.trim().is_empty() || chat_id.trim().is_empty() {
            anyhow::bail!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID must be non-empty");
        }

        Ok(Self::new(bot_token, chat_id))
    }
}

#[async_trait]
impl Notify for TelegramNotifier {
    /// POST /bot{token}/sendMessage.
    #[instrument(skip(self, text), name = "telegram::send")]
    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);

        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .context("POST sendMessage request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram sendMessage returned {}: {}", status, body);
        }

        debug!("alert delivered");
        Ok(())
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}
