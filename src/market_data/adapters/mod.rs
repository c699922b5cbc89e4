// Shared trait + row type for page snapshot fetchers

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// One table row exactly as scraped (columns 1-6 of the earn table).
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub asset: String,
    pub ft_apy: String,
    pub ot: String,
    pub token_apr: String,
    pub tvl: String,
    pub capacity: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("page returned status {0}")]
    Status(u16),

    #[error("fetch command failed: {0}")]
    Command(String),

    #[error("unexpected page structure: {0}")]
    Structure(String),
}

/// Produces the rows of one page snapshot.
///
/// Implementations must release whatever they hold (HTTP connection, browser
/// process) on every exit path, including when the caller drops the future on
/// timeout.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawRow>, FetchError>;

    /// Human-readable target, used in logs and the startup message.
    fn target(&self) -> &str;
}

pub mod yieldbasis;
pub mod yieldbasis_types;
pub mod command;
