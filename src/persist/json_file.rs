use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::persist::types::{PersistResult, SnapshotData};
use crate::persist::SnapshotStore;

/// Last committed snapshot as a pretty-printed JSON file.
/// Saves go through a temp file and a rename so readers never see half a file.
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

pub(crate) async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn load_snapshot(&self) -> PersistResult<Option<SnapshotData>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No committed snapshot yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let data: SnapshotData = serde_json::from_slice(&bytes)?;
        info!(entries = data.pools.len(), "Loaded previous entries");
        Ok(Some(data))
    }

    async fn save_snapshot(&self, snapshot: &SnapshotData) -> PersistResult<()> {
        ensure_parent(&self.path).await?;
        let json = serde_json::to_vec_pretty(snapshot)?;

        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path).await?;

        info!(entries = snapshot.pools.len(), path = %self.path.display(), "Saved entries to storage");
        Ok(())
    }
}
