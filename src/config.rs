use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::channel::CommandSource;
use crate::fetch::FetchOptions;
use crate::trend::TREND_CAPACITY;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub channel: ChannelConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub hour_resource: String,
    pub minute_resource: String,
    pub second_resource: String,
    pub live_resource: String,
    pub history_chunk_bytes: usize,
    pub live_chunk_bytes: usize,
    pub history_timeout_secs: u64,
    pub history_poll_ms: u64,
    pub live_poll_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            hour_resource: "hist1h".to_string(),
            minute_resource: "hist1m".to_string(),
            second_resource: "hist1s".to_string(),
            live_resource: "rt".to_string(),
            history_chunk_bytes: 16_384,
            live_chunk_bytes: 4096,
            history_timeout_secs: 300,
            history_poll_ms: 100,
            live_poll_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub symbols: Vec<String>,
    pub trend_capacity: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                "EURUSD".to_string(),
                "GBPUSD".to_string(),
                "USDCHF".to_string(),
            ],
            trend_capacity: TREND_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl FeedConfig {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            second_resource: self.second_resource.clone(),
            minute_resource: self.minute_resource.clone(),
            hour_resource: self.hour_resource.clone(),
            chunk_bytes: self.history_chunk_bytes,
            timeout: Duration::from_secs(self.history_timeout_secs),
            poll_interval: Duration::from_millis(self.history_poll_ms),
        }
    }
}

impl ChannelConfig {
    pub fn command_source(&self) -> CommandSource {
        CommandSource::new(self.program.clone(), self.args.clone())
    }
}

impl LiveConfig {
    /// Watchlist symbols, upper-cased, blanks and duplicates removed.
    pub fn watchlist(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for sym in &self.symbols {
            let s = sym.trim().to_ascii_uppercase();
            if !s.is_empty() && !out.iter().any(|v| v == &s) {
                out.push(s);
            }
        }
        out
    }
}

fn config_path() -> PathBuf {
    std::env::var("FX_FEED_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from_path(&config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel.program.trim().is_empty() {
            bail!("channel.program must not be empty");
        }
        let templated = self.channel.program.contains("{resource}")
            || self.channel.args.iter().any(|a| a.contains("{resource}"));
        if !templated {
            bail!("channel.program or channel.args must contain a {{resource}} placeholder");
        }

        let feed = &self.feed;
        for (name, value) in [
            ("feed.hour_resource", &feed.hour_resource),
            ("feed.minute_resource", &feed.minute_resource),
            ("feed.second_resource", &feed.second_resource),
            ("feed.live_resource", &feed.live_resource),
        ] {
            if value.trim().is_empty() {
                bail!("{} must not be empty", name);
            }
        }
        if feed.history_chunk_bytes == 0 || feed.live_chunk_bytes == 0 {
            bail!("feed chunk sizes must be > 0");
        }
        if feed.history_poll_ms == 0 || feed.live_poll_ms == 0 {
            bail!("feed poll intervals must be > 0");
        }
        if self.live.trend_capacity == 0 {
            bail!("live.trend_capacity must be > 0");
        }
        Ok(())
    }
}
