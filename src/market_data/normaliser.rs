// Raw scraped rows -> canonical token-keyed snapshot.
// One malformed row fails the whole batch; there are no partial snapshots.

use tracing::{debug, warn};

use crate::engine::types::{CanonicalRecord, Snapshot};
use crate::market_data::adapters::RawRow;
use crate::market_data::fields::{normalize_capacity, parse_token_and_tvl, ParseError};

pub fn normalise_row(row: &RawRow) -> Result<CanonicalRecord, ParseError> {
    let (tvl, token) = parse_token_and_tvl(&row.tvl)?;
    Ok(CanonicalRecord {
        timestamp: row.captured_at,
        token,
        capacity: normalize_capacity(&row.capacity),
        ft_apy_30d: row.ft_apy.trim().to_string(),
        token_apr: row.token_apr.trim().to_string(),
        tvl,
    })
}

/// Parse every row, in scrape order. Fails on the first malformed row.
pub fn normalise_rows(rows: &[RawRow]) -> Result<Vec<CanonicalRecord>, ParseError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            normalise_row(row).map_err(|e| {
                warn!(row = i, asset = %row.asset, error = %e, "Failed to parse scraped row");
                ParseError::Row { row: i, cause: Box::new(e) }
            })
        })
        .collect()
}

/// Key records by token. A token seen twice keeps the later record.
pub fn into_snapshot(records: impl IntoIterator<Item = CanonicalRecord>) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for record in records {
        if let Some(prev) = snapshot.insert(record) {
            debug!(token = %prev.token, "Duplicate token in one fetch, later row wins");
        }
    }
    snapshot
}

/// Build the current snapshot from one fetch.
pub fn normalise(rows: &[RawRow]) -> Result<Snapshot, ParseError> {
    Ok(into_snapshot(normalise_rows(rows)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn raw(tvl: &str, capacity: &str) -> RawRow {
        RawRow {
            asset: "asset".into(),
            ft_apy: " 9.87% ".into(),
            ot: String::new(),
            token_apr: "10.62%".into(),
            tvl: tvl.into(),
            capacity: capacity.into(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalise_rows() {
        let rows = vec![raw("1.5K cbBTC $", "87.50%"), raw("575.35 WETH $", "FILLED")];
        let snap = normalise(&rows).unwrap();

        assert_eq!(snap.len(), 2);
        let weth = snap.get("WETH").unwrap();
        assert_eq!(weth.capacity.as_str(), "100.00%");
        assert_eq!(weth.tvl, 575.35);
        assert_eq!(weth.ft_apy_30d, "9.87%");
        assert_eq!(snap.get("cbBTC").unwrap().tvl, 1500.0);
    }

    #[test]
    fn test_empty_fetch_gives_empty_snapshot() {
        assert!(normalise(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_token_last_wins() {
        let rows = vec![raw("1 WETH $", "10.00%"), raw("2 cbBTC $", "5.00%"), raw("3 WETH $", "20.00%")];
        let snap = normalise(&rows).unwrap();

        assert_eq!(snap.len(), 2);
        assert_eq!(snap.get("WETH").unwrap().capacity.as_str(), "20.00%");
        assert_eq!(snap.tokens().collect::<Vec<_>>(), vec!["WETH", "cbBTC"]);
    }

    #[test]
    fn test_one_bad_row_aborts() {
        let rows = vec![raw("1 WETH $", "10.00%"), raw("garbage", "10.00%")];
        match normalise(&rows) {
            Err(ParseError::Row { row, cause }) => {
                assert_eq!(row, 1);
                assert!(matches!(*cause, ParseError::TokenTvl { .. }));
            }
            other => panic!("Expected row error, got {:?}", other),
        }
    }
}
