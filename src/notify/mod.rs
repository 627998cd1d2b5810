//! Notification delivery.
//!
//! Fire-and-forget text payloads to a configured set of recipients.
//! Delivery failure is never fatal: one recipient's error is logged and
//! the loop moves on, and the scanner treats a fully failed send the same
//! as a successful one.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const TELEGRAM_API: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Destination-agnostic text sink.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `text` to all recipients. Returns true if at least one
    /// delivery succeeded.
    async fn send(&self, text: &str) -> bool;
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

/// Telegram bot sender. Payloads use HTML parse mode (bold markup only).
pub struct TelegramNotifier {
    http: Client,
    token: String,
    chat_ids: Vec<String>,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_ids: Vec<String>) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(SEND_TIMEOUT).build()?;
        let chat_ids = chat_ids
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        Ok(TelegramNotifier {
            http,
            token,
            chat_ids,
        })
    }

    pub fn recipient_count(&self) -> usize {
        self.chat_ids.len()
    }

    async fn send_one(&self, chat_id: &str, text: &str) -> anyhow::Result<bool> {
        let url = format!("{TELEGRAM_API}/bot{}/sendMessage", self.token);
        let response: serde_json::Value = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await?
            .json()
            .await?;
        Ok(response["ok"].as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send(&self, text: &str) -> bool {
        let mut delivered = false;
        for chat_id in &self.chat_ids {
            match self.send_one(chat_id, text).await {
                Ok(true) => {
                    debug!(chat_id = %chat_id, "Notification delivered");
                    delivered = true;
                }
                Ok(false) => {
                    warn!(chat_id = %chat_id, "Telegram rejected the message");
                }
                Err(e) => {
                    warn!(chat_id = %chat_id, error = %e, "Notification delivery failed");
                }
            }
        }
        delivered
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_recipients_is_a_noop() {
        let notifier = TelegramNotifier::new("dummy-token".into(), Vec::new()).unwrap();
        assert_eq!(notifier.recipient_count(), 0);
        // No recipients, no network traffic, no success.
        assert!(!notifier.send("hello").await);
    }

    #[test]
    fn test_blank_chat_ids_are_dropped() {
        let notifier = TelegramNotifier::new(
            "dummy-token".into(),
            vec![" 123 ".into(), "".into(), "  ".into(), "456".into()],
        )
        .unwrap();
        assert_eq!(notifier.recipient_count(), 2);
    }
}
