use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capacity as shown on the page, e.g. `87.50%`.
///
/// Kept as the source string so equality is exact; `value()` is only used for
/// display decisions (direction arrows, available space).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(String);

impl Percentage {
    pub const FULL: &'static str = "100.00%";

    pub fn new(s: impl Into<String>) -> Self {
        Percentage(s.into())
    }

    pub fn full() -> Self {
        Percentage(Self::FULL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value in [0, 100] if the string looks like `12.34%`.
    pub fn value(&self) -> Option<f64> {
        let v: f64 = self.0.trim().trim_end_matches('%').trim().replace(',', "").parse().ok()?;
        (0.0..=100.0).contains(&v).then_some(v)
    }

    /// Share of `amount` not yet taken: `amount * (100 - value) / 100`.
    pub fn remaining_of(&self, amount: f64) -> Option<f64> {
        self.value().map(|pct| amount * (100.0 - pct) / 100.0)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

// One pool as observed in a single scrape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub timestamp: DateTime<Utc>,
    pub token: String,
    pub capacity: Percentage,
    pub ft_apy_30d: String, // APY descriptor column, kept verbatim
    pub token_apr: String,
    pub tvl: f64,
}

impl CanonicalRecord {
    /// Room left in the pool: `tvl * (100 - capacity) / 100`.
    pub fn available_space(&self) -> Option<f64> {
        self.capacity.remaining_of(self.tvl)
    }
}

/// Token-keyed view of one scrape. Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: Vec<CanonicalRecord>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by token. A replaced record keeps its original position.
    pub fn insert(&mut self, record: CanonicalRecord) -> Option<CanonicalRecord> {
        match self.index.get(&record.token) {
            Some(&pos) => Some(std::mem::replace(&mut self.records[pos], record)),
            None => {
                self.index.insert(record.token.clone(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    pub fn get(&self, token: &str) -> Option<&CanonicalRecord> {
        self.index.get(token).map(|&pos| &self.records[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.records.iter()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.token.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<CanonicalRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = CanonicalRecord>>(iter: I) -> Self {
        let mut snap = Snapshot::new();
        for record in iter {
            snap.insert(record);
        }
        snap
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a CanonicalRecord;
    type IntoIter = std::slice::Iter<'a, CanonicalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// Detected transition between the committed and the current snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    New {
        token: String,
        capacity: Percentage,
        token_apr: String,
        tvl: f64,
    },
    CapacityChange {
        token: String,
        old_capacity: Percentage,
        new_capacity: Percentage,
        token_apr: String,
        tvl: f64,
    },
}

impl ChangeEvent {
    pub fn token(&self) -> &str {
        match self {
            ChangeEvent::New { token, .. } | ChangeEvent::CapacityChange { token, .. } => token,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::New { .. } => "new",
            ChangeEvent::CapacityChange { .. } => "capacity_change",
        }
    }
}

#[cfg(test)]
pub(crate) fn record(token: &str, capacity: &str, tvl: f64) -> CanonicalRecord {
    CanonicalRecord {
        timestamp: DateTime::from_timestamp(1_768_131_241, 0).unwrap_or_default(),
        token: token.to_string(),
        capacity: Percentage::new(capacity),
        ft_apy_30d: "9.87%".to_string(),
        token_apr: "10%".to_string(),
        tvl,
    }
}
