use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const DEFAULT_TARGET_URL: &str = "https://yieldbasis.com/earn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    Http,
    Command,
}

/// Everything the monitor needs, resolved once at startup.
///
/// Sources, later ones winning: built-in defaults, the TOML file, then
/// `CAPWATCH_*` environment variables (a `.env` file is loaded first).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub target_url: String,
    pub check_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub notify_pause_ms: u64,
    pub storage_dir: PathBuf,
    pub snapshot_file: String,
    pub history_file: String,
    pub fetcher: FetcherKind,
    #[serde(default)]
    pub fetch_command: Vec<String>,
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    pub alert_on_error: bool,
    pub log_filter: String,
    pub metrics_listen: String,
}

impl Settings {
    /// `path` overrides the default `capwatch.toml`; the file is optional
    /// unless a path was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name("capwatch").required(false),
        };

        let settings: Settings = config::Config::builder()
            .set_default("target_url", DEFAULT_TARGET_URL)?
            .set_default("check_interval_secs", 120)?
            .set_default("fetch_timeout_secs", 60)?
            .set_default("notify_pause_ms", 1000)?
            .set_default("storage_dir", "data/out")?
            .set_default("snapshot_file", "yieldbasis_capacity_data.json")?
            .set_default("history_file", "yieldbasis_capacity_data_history.csv")?
            .set_default("fetcher", "http")?
            .set_default("alert_on_error", true)?
            .set_default("log_filter", "info")?
            .set_default("metrics_listen", "0.0.0.0:9000")?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("CAPWATCH")
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("fetch_command"),
            )
            .build()
            .context("reading configuration")?
            .try_deserialize()
            .context("parsing configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            bail!("check_interval_secs must be greater than zero");
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be greater than zero");
        }
        if self.fetcher == FetcherKind::Command && self.fetch_command.is_empty() {
            bail!("fetcher = \"command\" needs a non-empty fetch_command");
        }
        if self.telegram_bot_token.is_some() != self.telegram_chat_id.is_some() {
            bail!("telegram_bot_token and telegram_chat_id must be set together");
        }
        Ok(())
    }

    /// Settings that load fine but are unlikely to work as intended.
    pub fn advisories(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if self.fetcher == FetcherKind::Http && self.target_url == DEFAULT_TARGET_URL {
            notes.push(format!(
                "fetcher = \"http\" cannot read {DEFAULT_TARGET_URL}: the table is rendered client-side, \
                 every check will fail with a structure error; use fetcher = \"command\""
            ));
        }
        notes
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn notify_pause(&self) -> Duration {
        Duration::from_millis(self.notify_pause_ms)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.storage_dir.join(&self.snapshot_file)
    }

    pub fn history_path(&self) -> PathBuf {
        self.storage_dir.join(&self.history_file)
    }

    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) => Some((token.as_str(), chat.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
check_interval_secs = 30
storage_dir = "/tmp/capwatch"
fetcher = "command"
fetch_command = ["node", "scrape.js"]
"#
        )
        .unwrap();

        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.check_interval(), Duration::from_secs(30));
        assert_eq!(s.fetch_timeout(), Duration::from_secs(60));
        assert_eq!(s.target_url, DEFAULT_TARGET_URL);
        assert_eq!(s.fetcher, FetcherKind::Command);
        assert_eq!(s.fetch_command, vec!["node", "scrape.js"]);
        assert_eq!(s.snapshot_path(), PathBuf::from("/tmp/capwatch/yieldbasis_capacity_data.json"));
        assert!(s.telegram().is_none());
        assert_eq!(s.metrics_listen, "0.0.0.0:9000");
    }

    #[test]
    fn test_http_fetcher_on_default_target_is_flagged() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.fetcher, FetcherKind::Http);
        assert_eq!(s.advisories().len(), 1);
        assert!(s.advisories()[0].contains("fetcher = \"command\""));

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "target_url = \"http://prerender.local/earn\"").unwrap();
        assert!(Settings::load(Some(file.path())).unwrap().advisories().is_empty());

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "fetcher = \"command\"\nfetch_command = [\"node\", \"scrape.js\"]").unwrap();
        assert!(Settings::load(Some(file.path())).unwrap().advisories().is_empty());
    }

    #[test]
    fn test_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "fetcher = \"command\"").unwrap();
        assert!(Settings::load(Some(file.path())).is_err());

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "check_interval_secs = 0").unwrap();
        assert!(Settings::load(Some(file.path())).is_err());

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "telegram_bot_token = \"abc\"").unwrap();
        assert!(Settings::load(Some(file.path())).is_err());
    }
}
