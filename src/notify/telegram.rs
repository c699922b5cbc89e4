use std::time::Duration;

use tracing::{debug, instrument};

use super::{AlertSink, DeliveryError};

const API_BASE: &str = "https://api.telegram.org";

/// Posts alerts to one chat through the Bot API `sendMessage` call.
pub struct TelegramSink {
    bot_token: String,
    chat_id: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramSink {
    pub fn new(bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Http(e.without_url()))?;
        Ok(Self {
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            api_base: API_BASE.to_string(),
            client,
        })
    }

    /// Point at a different API host (self-hosted Bot API server).
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    pub fn payload(&self, message: &str) -> serde_json::Value {
        serde_json::json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "HTML",
        })
    }
}

#[async_trait::async_trait]
impl AlertSink for TelegramSink {
    #[instrument(level = "debug", skip_all, fields(chat_id = %self.chat_id))]
    async fn send(&self, message: &str) -> Result<(), DeliveryError> {
        // the URL carries the bot token, keep it out of errors and logs
        let res = self
            .client
            .post(self.url())
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| DeliveryError::Http(e.without_url()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected { status: status.as_u16(), body });
        }
        debug!("Telegram notification sent successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_http::serve_once;

    #[test]
    fn test_url_and_payload() {
        let sink = TelegramSink::new("123:abc", "-10042", Duration::from_secs(5))
            .unwrap()
            .with_api_base("http://localhost:8081/");

        assert_eq!(sink.url(), "http://localhost:8081/bot123:abc/sendMessage");
        let payload = sink.payload("<b>hi</b>");
        assert_eq!(payload["chat_id"], "-10042");
        assert_eq!(payload["text"], "<b>hi</b>");
        assert_eq!(payload["parse_mode"], "HTML");
    }

    #[tokio::test]
    async fn test_non_2xx_is_rejected() {
        let base = serve_once(429, "Too Many Requests", Some(r#"{"ok":false}"#)).await;
        let sink = TelegramSink::new("123:abc", "-10042", Duration::from_secs(5))
            .unwrap()
            .with_api_base(&base);

        match sink.send("hi").await {
            Err(DeliveryError::Rejected { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, r#"{"ok":false}"#);
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_error_hides_token() {
        let sink = TelegramSink::new("123456:SECRET-TOKEN", "-10042", Duration::from_secs(5))
            .unwrap()
            .with_api_base("http://127.0.0.1:1");

        let err = sink.send("hi").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Http(_)));
        assert!(!err.to_string().contains("SECRET-TOKEN"), "token leaked: {err}");
        assert!(!format!("{err:?}").contains("SECRET-TOKEN"));
    }
}
