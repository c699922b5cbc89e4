// Runs an external headless-browser script and reads its rows from stdout.
// The script prints a JSON array of `PageRow` objects and exits.

use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::yieldbasis_types::PageRow;
use super::{FetchError, PageFetcher, RawRow};

pub struct CommandFetcher {
    pub program: String,
    pub args: Vec<String>,
    pub target: String,
    pub timeout: Duration,
}

impl CommandFetcher {
    /// `argv[0]` is the program, the rest are its arguments.
    pub fn new(argv: &[String], target: &str, timeout: Duration) -> Result<Self, FetchError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| FetchError::Command("empty fetch command".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            target: target.to_string(),
            timeout,
        })
    }
}

pub fn parse_rows(stdout: &[u8]) -> Result<Vec<RawRow>, FetchError> {
    let page_rows: Vec<PageRow> = serde_json::from_slice(stdout)
        .map_err(|e| FetchError::Structure(format!("fetch command output is not a row array: {e}")))?;
    let now = Utc::now();
    Ok(page_rows
        .into_iter()
        .filter(|r| !r.col1_asset.trim().is_empty())
        .map(|r| r.into_raw(now))
        .collect())
}

#[async_trait::async_trait]
impl PageFetcher for CommandFetcher {
    #[instrument(level = "debug", skip(self), fields(program = %self.program))]
    async fn fetch(&self) -> Result<Vec<RawRow>, FetchError> {
        info!(target_url = %self.target, "Starting scrape");

        // kill_on_drop covers timeout and caller cancellation alike
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FetchError::Command(format!("spawning {}: {e}", self.program)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
            .map_err(|e| FetchError::Command(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr.trim(), "Fetch command failed");
            return Err(FetchError::Command(format!("exited with {}", output.status)));
        }

        debug!(bytes = output.stdout.len(), "Fetch command finished");
        let rows = parse_rows(&output.stdout)?;
        info!(rows = rows.len(), "Successfully scraped rows");
        Ok(rows)
    }

    fn target(&self) -> &str {
        &self.target
    }
}
