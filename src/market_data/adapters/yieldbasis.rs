// YieldBasis earn page over plain HTTP.
// Works against a server-rendered copy of the page (or a prerendering proxy);
// for the live JS-rendered page use the command fetcher.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument};

use super::{FetchError, PageFetcher, RawRow};
use crate::market_data::html::table_body_cells;

pub struct HtmlTableFetcher {
    pub url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HtmlTableFetcher {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("capwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { url: url.to_string(), timeout, client })
    }
}

/// Turn extracted `<td>` texts into rows. Cell 0 is the icon column; cells 1-6
/// carry the data. Rows with an empty asset cell are skipped.
pub fn rows_from_cells(cells: Vec<Vec<String>>) -> Vec<RawRow> {
    let now = Utc::now();
    cells
        .into_iter()
        .filter_map(|row| {
            let get = |i: usize| row.get(i).cloned().unwrap_or_default();
            let asset = get(1);
            if asset.is_empty() {
                return None;
            }
            Some(RawRow {
                asset,
                ft_apy: get(2),
                ot: get(3),
                token_apr: get(4),
                tvl: get(5),
                capacity: get(6),
                captured_at: now,
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl PageFetcher for HtmlTableFetcher {
    #[instrument(level = "debug", skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<RawRow>, FetchError> {
        info!("Fetching page");
        let res = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = res.text().await?;
        debug!(bytes = body.len(), "Page downloaded");

        let cells = table_body_cells(&body)
            .ok_or_else(|| FetchError::Structure("no <tbody> found on page".into()))?;
        let rows = rows_from_cells(cells);
        info!(rows = rows.len(), "Successfully scraped rows");
        Ok(rows)
    }

    fn target(&self) -> &str {
        &self.url
    }
}
