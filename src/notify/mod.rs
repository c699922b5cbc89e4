// Alert delivery: sink trait, message formatting, the rate-limited coordinator
pub mod coordinator;
pub mod format;
pub mod telegram;

pub use coordinator::{DeliveryReport, Notifier};
pub use telegram::TelegramSink;

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sink rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

/// Where formatted alerts go. Any error counts as "not delivered".
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), DeliveryError>;
}

/// Writes alerts to the log. Used when no chat credentials are configured.
pub struct LogSink;

#[async_trait::async_trait]
impl AlertSink for LogSink {
    async fn send(&self, message: &str) -> Result<(), DeliveryError> {
        info!(message = %message, "Alert");
        Ok(())
    }
}
