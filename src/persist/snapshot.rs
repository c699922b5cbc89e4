//! Pure conversions between the in-memory `Snapshot` and the serializable snapshot type.
//!
//! This file MUST NOT touch the filesystem. Only struct <-> struct mapping lives here.

use chrono::Utc;

use crate::engine::types::Snapshot;
use crate::persist::types::{PersistError, PersistResult, SnapshotData, SNAPSHOT_SCHEMA_VERSION};

/// Build the persisted form of a snapshot, stamped with the commit time.
pub fn from_snapshot(snapshot: &Snapshot) -> SnapshotData {
    SnapshotData {
        version: SNAPSHOT_SCHEMA_VERSION,
        committed_at: Utc::now(),
        pools: snapshot.iter().map(|r| (r.token.clone(), r.clone())).collect(),
    }
}

/// Rebuild a `Snapshot` from persisted data.
/// Rejects other schema versions and entries whose key disagrees with their token.
pub fn to_snapshot(data: &SnapshotData) -> PersistResult<Snapshot> {
    if data.version != SNAPSHOT_SCHEMA_VERSION {
        return Err(PersistError::FormatMismatch {
            found: data.version,
            expected: SNAPSHOT_SCHEMA_VERSION,
        });
    }

    let mut snapshot = Snapshot::new();
    for (key, record) in &data.pools {
        if key != &record.token {
            return Err(PersistError::KeyMismatch {
                key: key.clone(),
                token: record.token.clone(),
            });
        }
        snapshot.insert(record.clone());
    }
    Ok(snapshot)
}
