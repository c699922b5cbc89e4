// Row shape emitted by the headless-browser extraction script.
// Source: `document.querySelectorAll('table tbody tr')`, cells 1..=6 of each row.
use chrono::{DateTime, Utc};

use super::RawRow;

#[derive(Debug, serde::Deserialize)]
pub struct PageRow {
    #[serde(default)]
    pub col1_asset: String,     // asset symbol
    #[serde(default)]
    pub col2_ft_apy: String,    // FT APY
    #[serde(default)]
    pub col3_ot: String,        // OT info
    #[serde(default)]
    pub col4_token_apr: String, // token APR
    #[serde(default)]
    pub col5_tvl: String,       // e.g. "1.5K cbBTC $150.2M"
    #[serde(default)]
    pub col6_capacity: String,  // e.g. "87.50%" or "FILLED"
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PageRow {
    pub fn into_raw(self, fallback_ts: DateTime<Utc>) -> RawRow {
        RawRow {
            asset: self.col1_asset,
            ft_apy: self.col2_ft_apy,
            ot: self.col3_ot,
            token_apr: self.col4_token_apr,
            tvl: self.col5_tvl,
            capacity: self.col6_capacity,
            captured_at: self.timestamp.unwrap_or(fallback_ts),
        }
    }
}
