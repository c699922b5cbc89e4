use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use capwatch::config::{FetcherKind, Settings};
use capwatch::engine::types::CanonicalRecord;
use capwatch::market_data::adapters::command::CommandFetcher;
use capwatch::market_data::adapters::yieldbasis::HtmlTableFetcher;
use capwatch::market_data::adapters::PageFetcher;
use capwatch::monitor::{Monitor, MonitorOptions};
use capwatch::notify::format::format_amount;
use capwatch::notify::{AlertSink, LogSink, Notifier, TelegramSink};
use capwatch::persist::history::read_history;
use capwatch::persist::snapshot::to_snapshot;
use capwatch::persist::{CsvHistoryLog, JsonSnapshotStore, SnapshotStore};
use capwatch::telemetry;

#[derive(Parser)]
#[command(name = "capwatch", about = "Watches pool capacity on a DeFi earn page and alerts on changes")]
struct Cli {
    /// Config file (defaults to ./capwatch.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check on a schedule until Ctrl-C
    Run,
    /// Run one check and exit
    Once,
    /// Print the last committed snapshot
    Status,
    /// Print the most recent history rows
    History {
        #[arg(long, default_value_t = 20)]
        last: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    telemetry::init_tracing(&settings.log_filter);
    for note in settings.advisories() {
        warn!("{note}");
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            telemetry::init_metrics(&settings.metrics_listen)?;
            let mut monitor = build_monitor(&settings)?;

            let (tx, rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown requested, finishing current check");
                    let _ = tx.send(true);
                }
            });

            monitor.run(rx).await;
        }
        Command::Once => {
            let mut monitor = build_monitor(&settings)?;
            let outcome = monitor.run_once().await?;
            println!("{:?}", outcome);
        }
        Command::Status => print_status(&settings).await?,
        Command::History { last } => print_history(&settings, last)?,
    }

    Ok(())
}

fn build_monitor(settings: &Settings) -> anyhow::Result<Monitor> {
    let fetcher: Box<dyn PageFetcher> = match settings.fetcher {
        FetcherKind::Http => Box::new(HtmlTableFetcher::new(&settings.target_url, settings.fetch_timeout())?),
        FetcherKind::Command => Box::new(CommandFetcher::new(
            &settings.fetch_command,
            &settings.target_url,
            settings.fetch_timeout(),
        )?),
    };

    let sink: Box<dyn AlertSink> = match settings.telegram() {
        Some((token, chat_id)) => Box::new(TelegramSink::new(token, chat_id, settings.fetch_timeout())?),
        None => {
            warn!("No Telegram credentials configured, alerts go to the log only");
            Box::new(LogSink)
        }
    };

    Ok(Monitor::new(
        fetcher,
        Box::new(JsonSnapshotStore::new(settings.snapshot_path())),
        Box::new(CsvHistoryLog::new(settings.history_path())),
        Notifier::new(sink, settings.notify_pause()),
        MonitorOptions::from(settings),
    ))
}

async fn print_status(settings: &Settings) -> anyhow::Result<()> {
    let store = JsonSnapshotStore::new(settings.snapshot_path());
    let Some(data) = store.load_snapshot().await? else {
        println!("No committed snapshot at {}", store.path().display());
        return Ok(());
    };
    let snapshot = to_snapshot(&data).context("committed snapshot is unusable")?;

    println!("\n=== Committed at {} ===", data.committed_at.to_rfc3339());
    println!("{:<10} {:>10} {:>18} {:>18} {:>10}", "Token", "Capacity", "TVL", "Available", "APR");
    for record in snapshot.iter() {
        print_record(record);
    }
    println!("{} pool(s)", snapshot.len());
    Ok(())
}

fn print_history(settings: &Settings, last: usize) -> anyhow::Result<()> {
    let path = settings.history_path();
    if !path.exists() {
        println!("No history at {}", path.display());
        return Ok(());
    }
    let rows = read_history(&path)?;
    let skip = rows.len().saturating_sub(last);
    for record in &rows[skip..] {
        print!("{}  ", record.timestamp.format("%Y-%m-%d %H:%M:%S"));
        print_record(record);
    }
    Ok(())
}

fn print_record(r: &CanonicalRecord) {
    let available = r.available_space().map(format_amount).unwrap_or_else(|| "-".to_string());
    println!(
        "{:<10} {:>10} {:>18} {:>18} {:>10}",
        r.token,
        r.capacity,
        format_amount(r.tvl),
        available,
        r.token_apr
    );
}
