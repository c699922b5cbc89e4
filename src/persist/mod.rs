pub mod types;
pub use types::*;
pub mod snapshot;
pub mod json_file;
pub mod history;
pub mod memory;

pub use history::CsvHistoryLog;
pub use json_file::JsonSnapshotStore;
pub use memory::{MemoryHistoryLog, MemorySnapshotStore};

use async_trait::async_trait;

use crate::engine::types::CanonicalRecord;

/// Holds the last committed snapshot. Written at most once per cycle.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load_snapshot(&self) -> PersistResult<Option<SnapshotData>>;
    async fn save_snapshot(&self, snapshot: &SnapshotData) -> PersistResult<()>;
}

/// Append-only audit trail of every scraped record.
#[async_trait]
pub trait HistoryLog: Send + Sync {
    /// Returns the number of rows written.
    async fn append(&self, records: &[CanonicalRecord]) -> PersistResult<usize>;
}
