// In-memory stores. Clones share state, so a caller can keep a handle
// and inspect what the monitor wrote.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::types::CanonicalRecord;
use crate::persist::types::{PersistError, PersistResult, SnapshotData};
use crate::persist::{HistoryLog, SnapshotStore};

#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<Mutex<Option<SnapshotData>>>,
    fail_saves: Arc<Mutex<bool>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(data: SnapshotData) -> Self {
        let store = Self::default();
        *store.inner.lock() = Some(data);
        store
    }

    pub fn current(&self) -> Option<SnapshotData> {
        self.inner.lock().clone()
    }

    /// Make subsequent saves fail with an I/O error.
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load_snapshot(&self) -> PersistResult<Option<SnapshotData>> {
        Ok(self.inner.lock().clone())
    }

    async fn save_snapshot(&self, snapshot: &SnapshotData) -> PersistResult<()> {
        if *self.fail_saves.lock() {
            return Err(PersistError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "snapshot store unavailable",
            )));
        }
        *self.inner.lock() = Some(snapshot.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryHistoryLog {
    rows: Arc<Mutex<Vec<CanonicalRecord>>>,
}

impl MemoryHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<CanonicalRecord> {
        self.rows.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait::async_trait]
impl HistoryLog for MemoryHistoryLog {
    async fn append(&self, records: &[CanonicalRecord]) -> PersistResult<usize> {
        self.rows.lock().extend_from_slice(records);
        Ok(records.len())
    }
}
