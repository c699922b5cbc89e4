use tracing::{debug, instrument};

use crate::engine::types::{ChangeEvent, Snapshot};

/// Compare the last committed snapshot against a fresh one.
///
/// Walks `current` in scrape order and reports new tokens and capacity changes.
/// Tokens only present in `previous` are not reported, and changes to TVL or APR
/// alone never produce an event.
#[instrument(level = "debug", skip_all, fields(previous = previous.len(), current = current.len()))]
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for record in current {
        match previous.get(&record.token) {
            None => {
                debug!(token = %record.token, "New pool detected");
                events.push(ChangeEvent::New {
                    token: record.token.clone(),
                    capacity: record.capacity.clone(),
                    token_apr: record.token_apr.clone(),
                    tvl: record.tvl,
                });
            }
            Some(prev) if prev.capacity != record.capacity => {
                debug!(token = %record.token, old = %prev.capacity, new = %record.capacity, "Capacity changed");
                events.push(ChangeEvent::CapacityChange {
                    token: record.token.clone(),
                    old_capacity: prev.capacity.clone(),
                    new_capacity: record.capacity.clone(),
                    token_apr: record.token_apr.clone(),
                    tvl: record.tvl,
                });
            }
            Some(_) => {}
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{record, Percentage};

    #[test]
    fn test_new_token_from_empty() {
        let previous = Snapshot::new();
        let current: Snapshot = [record("cbBTC", "87.50%", 1500.0)].into_iter().collect();

        let events = diff(&previous, &current);
        assert_eq!(
            events,
            vec![ChangeEvent::New {
                token: "cbBTC".into(),
                capacity: Percentage::new("87.50%"),
                token_apr: "10%".into(),
                tvl: 1500.0,
            }]
        );
    }

    #[test]
    fn test_capacity_change() {
        let previous: Snapshot = [record("cbBTC", "87.50%", 1500.0)].into_iter().collect();
        let current: Snapshot = [record("cbBTC", "100.00%", 1600.0)].into_iter().collect();

        let events = diff(&previous, &current);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ChangeEvent::CapacityChange { token, old_capacity, new_capacity, tvl, .. } => {
                assert_eq!(token, "cbBTC");
                assert_eq!(old_capacity.as_str(), "87.50%");
                assert_eq!(new_capacity.as_str(), "100.00%");
                assert_eq!(*tvl, 1600.0);
            }
            other => panic!("Expected CapacityChange, got {:?}", other),
        }
    }

    #[test]
    fn test_disappeared_token_is_silent() {
        let previous: Snapshot = [record("cbBTC", "87.50%", 1.0), record("WETH", "50.00%", 1.0)]
            .into_iter()
            .collect();
        let current: Snapshot = [record("cbBTC", "87.50%", 1.0)].into_iter().collect();

        assert!(diff(&previous, &current).is_empty());
    }

    #[test]
    fn test_tvl_and_apr_changes_ignored() {
        let previous: Snapshot = [record("WETH", "50.00%", 1.0)].into_iter().collect();
        let mut changed = record("WETH", "50.00%", 999.0);
        changed.token_apr = "55%".into();
        let current: Snapshot = [changed].into_iter().collect();

        assert!(diff(&previous, &current).is_empty());
    }

    #[test]
    fn test_no_tolerance_on_capacity() {
        let previous: Snapshot = [record("WETH", "50.00%", 1.0)].into_iter().collect();
        let current: Snapshot = [record("WETH", "50.0%", 1.0)].into_iter().collect();

        assert_eq!(diff(&previous, &current).len(), 1);
    }

    #[test]
    fn test_order_follows_current_and_is_repeatable() {
        let previous: Snapshot = [record("B", "1.00%", 1.0)].into_iter().collect();
        let current: Snapshot = [
            record("C", "1.00%", 1.0),
            record("B", "2.00%", 1.0),
            record("A", "1.00%", 1.0),
        ]
        .into_iter()
        .collect();

        let first = diff(&previous, &current);
        let tokens: Vec<&str> = first.iter().map(|e| e.token()).collect();
        assert_eq!(tokens, vec!["C", "B", "A"]);
        assert_eq!(first[1].kind(), "capacity_change");

        assert_eq!(first, diff(&previous, &current));
    }
}
