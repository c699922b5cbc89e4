//! The monitor loop: one cycle is fetch -> normalise -> history -> diff ->
//! notify -> commit, run back to back with a fixed pause in between.
//!
//! The committed snapshot only moves forward after every alert of a cycle
//! went out. When anything fails the old snapshot stays in place, so the next
//! cycle detects the same changes again and re-sends them.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::config::Settings;
use crate::engine::diff;
use crate::engine::types::Snapshot;
use crate::market_data::adapters::{FetchError, PageFetcher};
use crate::market_data::fields::ParseError;
use crate::market_data::normaliser::{into_snapshot, normalise_rows};
use crate::notify::format::{error_message, status_message};
use crate::notify::Notifier;
use crate::persist::snapshot::{from_snapshot, to_snapshot};
use crate::persist::{HistoryLog, SnapshotStore};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("cycle panicked: {0}")]
    Panicked(String),
}

impl CycleError {
    pub fn stage(&self) -> &'static str {
        match self {
            CycleError::Fetch(_) => "fetch",
            CycleError::Parse(_) => "normalise",
            CycleError::Panicked(_) => "unknown",
        }
    }
}

/// How a cycle that got past normalisation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to report; the committed snapshot is left alone.
    Unchanged { rows: usize },
    /// Every alert delivered and the new snapshot committed.
    Committed { delivered: usize },
    /// At least one alert failed; nothing committed.
    DeliveryFailed { delivered: usize, failed: Vec<String> },
    /// Alerts went out but writing the snapshot failed.
    CommitFailed { delivered: usize },
}

impl CycleOutcome {
    fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Unchanged { .. } => "unchanged",
            CycleOutcome::Committed { .. } => "committed",
            CycleOutcome::DeliveryFailed { .. } => "delivery_failed",
            CycleOutcome::CommitFailed { .. } => "commit_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
}

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub interval: Duration,
    pub fetch_timeout: Duration,
    pub alert_on_error: bool,
}

impl From<&Settings> for MonitorOptions {
    fn from(s: &Settings) -> Self {
        Self {
            interval: s.check_interval(),
            fetch_timeout: s.fetch_timeout(),
            alert_on_error: s.alert_on_error,
        }
    }
}

pub struct Monitor {
    fetcher: Box<dyn PageFetcher>,
    snapshots: Box<dyn SnapshotStore>,
    history: Box<dyn HistoryLog>,
    notifier: Notifier,
    options: MonitorOptions,
    state: MonitorState,
}

impl Monitor {
    pub fn new(
        fetcher: Box<dyn PageFetcher>,
        snapshots: Box<dyn SnapshotStore>,
        history: Box<dyn HistoryLog>,
        notifier: Notifier,
        options: MonitorOptions,
    ) -> Self {
        Self { fetcher, snapshots, history, notifier, options, state: MonitorState::Idle }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Run a single cycle. Failures are logged and returned, never propagated
    /// as panics.
    pub async fn run_once(&mut self) -> Result<CycleOutcome, CycleError> {
        self.state = MonitorState::Running;
        let result = match AssertUnwindSafe(self.cycle()).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(CycleError::Panicked(panic_message(payload.as_ref()))),
        };
        self.state = MonitorState::Idle;

        match &result {
            Ok(outcome) => {
                metrics::counter!("capwatch_cycles_total", "outcome" => outcome.label()).increment(1);
            }
            Err(e) => {
                metrics::counter!("capwatch_cycles_total", "outcome" => "error").increment(1);
                error!(stage = e.stage(), error = %e, "Check failed");
                if self.options.alert_on_error {
                    let msg = error_message(&format!("Monitor check failed: {e}"));
                    if let Err(send_err) = self.notifier.sink().send(&msg).await {
                        warn!(error = %send_err, "Failed to send error alert");
                    }
                }
            }
        }
        result
    }

    /// Run cycles until `shutdown` turns true. The first cycle starts right
    /// away; each later one starts `interval` after the previous one ended.
    /// A stop request is only acted on between cycles.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.options.interval.as_secs(),
            target_url = %self.fetcher.target(),
            "Starting scheduled monitoring"
        );
        self.announce_start().await;

        loop {
            // Result already logged inside run_once
            let _ = self.run_once().await;

            let stop_requested = *shutdown.borrow();
            if stop_requested || self.idle(&mut shutdown).await {
                break;
            }
        }
        info!("Monitor stopped");
    }

    async fn announce_start(&self) {
        let status = format!(
            "Monitor started\nChecking every {} seconds\nTarget: {}",
            self.options.interval.as_secs(),
            self.fetcher.target()
        );
        if let Err(e) = self.notifier.sink().send(&status_message(&status)).await {
            warn!(error = %e, "Failed to send startup notification");
        }
    }

    /// Sleep out the interval. Returns true if a stop was requested meanwhile.
    async fn idle(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let sleep = tokio::time::sleep(self.options.interval);
        tokio::pin!(sleep);
        let mut closed = false;

        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                changed = shutdown.changed(), if !closed => match changed {
                    Ok(()) => {
                        let stop_requested = *shutdown.borrow();
                        if stop_requested {
                            return true;
                        }
                    }
                    // sender gone, nobody can stop us any more
                    Err(_) => closed = true,
                },
            }
        }
    }

    #[instrument(name = "cycle", skip(self))]
    async fn cycle(&self) -> Result<CycleOutcome, CycleError> {
        info!("Starting capacity check...");

        // STEP 1: fetch under a hard timeout; dropping the future releases the fetcher's resources
        let rows = tokio::time::timeout(self.options.fetch_timeout, self.fetcher.fetch())
            .await
            .map_err(|_| FetchError::Timeout(self.options.fetch_timeout))??;

        // STEP 2: normalise; one bad row aborts the cycle
        let records = normalise_rows(&rows)?;
        let row_count = records.len();

        // STEP 3: history is best-effort and happens before any diffing
        match self.history.append(&records).await {
            Ok(n) => {
                metrics::counter!("capwatch_history_rows_total").increment(n as u64);
            }
            Err(e) => error!(stage = "history", error = %e, "Failed to append history"),
        }

        let current = into_snapshot(records);
        metrics::gauge!("capwatch_tracked_pools").set(current.len() as f64);

        // STEP 4: diff against whatever was last committed
        let previous = self.load_committed().await;
        let events = diff(&previous, &current);
        if events.is_empty() {
            info!(rows = row_count, "No changes detected");
            return Ok(CycleOutcome::Unchanged { rows: row_count });
        }
        info!(changes = events.len(), "Detected change(s)");

        // STEP 5: deliver, then commit only if every alert went out
        let report = self.notifier.deliver(&events).await;
        if !report.all_succeeded() {
            warn!(
                delivered = report.delivered,
                failed = ?report.failed,
                "Some notifications failed, keeping previous snapshot for retry"
            );
            return Ok(CycleOutcome::DeliveryFailed { delivered: report.delivered, failed: report.failed });
        }

        match self.snapshots.save_snapshot(&from_snapshot(&current)).await {
            Ok(()) => {
                info!(delivered = report.delivered, "Check completed successfully");
                Ok(CycleOutcome::Committed { delivered: report.delivered })
            }
            Err(e) => {
                error!(stage = "commit", error = %e, "Failed to commit snapshot, changes will be re-sent");
                Ok(CycleOutcome::CommitFailed { delivered: report.delivered })
            }
        }
    }

    /// Missing or unreadable state counts as empty.
    async fn load_committed(&self) -> Snapshot {
        match self.snapshots.load_snapshot().await {
            Ok(Some(data)) => match to_snapshot(&data) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(stage = "load", error = %e, "Committed snapshot unusable, starting from empty");
                    Snapshot::new()
                }
            },
            Ok(None) => Snapshot::new(),
            Err(e) => {
                warn!(stage = "load", error = %e, "Error loading previous data, starting from empty");
                Snapshot::new()
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
