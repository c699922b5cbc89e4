use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::engine::types::CanonicalRecord;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("snapshot schema version {found}, expected {expected}")]
    FormatMismatch { found: u32, expected: u32 },

    #[error("snapshot entry {key:?} holds token {token:?}")]
    KeyMismatch { key: String, token: String },
}

pub type PersistResult<T> = Result<T, PersistError>;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// On-disk form of the last committed snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SnapshotData {
    pub version: u32,
    pub committed_at: DateTime<Utc>,
    pub pools: BTreeMap<String, CanonicalRecord>,
}

/// Header of the history CSV, in column order.
pub const HISTORY_COLUMNS: [&str; 6] = ["timestamp", "token", "capacity", "ft_apy_30d", "token_apr", "tvl"];
