use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::engine::types::CanonicalRecord;
use crate::persist::json_file::ensure_parent;
use crate::persist::types::{PersistResult, HISTORY_COLUMNS};
use crate::persist::HistoryLog;

/// Append-only CSV of every scraped record.
/// The header goes in once, when the file is first created (or found empty).
pub struct CsvHistoryLog {
    path: PathBuf,
}

impl CsvHistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Serialize records into CSV bytes, optionally preceded by the header line.
pub fn encode_rows(records: &[CanonicalRecord], with_header: bool) -> PersistResult<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    if with_header {
        wtr.write_record(HISTORY_COLUMNS)?;
    }
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    wtr.into_inner().map_err(|e| e.into_error().into())
}

/// Read every row back, oldest first.
pub fn read_history(path: &Path) -> PersistResult<Vec<CanonicalRecord>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[async_trait::async_trait]
impl HistoryLog for CsvHistoryLog {
    async fn append(&self, records: &[CanonicalRecord]) -> PersistResult<usize> {
        ensure_parent(&self.path).await?;

        let fresh = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };
        let bytes = encode_rows(records, fresh)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        debug!(rows = records.len(), header = fresh, path = %self.path.display(), "Appended history rows");
        Ok(records.len())
    }
}
