use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::OnceCell;

use crate::aggregator;
use crate::channel::ChannelSource;
use crate::config::Config;
use crate::error::FeedError;
use crate::fetch::{self, FetchOptions, ParsedDataset};
use crate::live::LiveFeed;
use crate::model::tick::Tick;
use crate::trend::TrendTracker;
use crate::window::TimeWindow;

/// Per-process state owned by the caller: the channel source, the historical
/// dataset (fetched at most once), and the live trend tracker.
pub struct Session {
    source: Arc<dyn ChannelSource>,
    fetch_options: FetchOptions,
    live_resource: String,
    live_chunk_bytes: usize,
    live_poll_interval: Duration,
    historical: OnceCell<Arc<ParsedDataset>>,
    tracker: TrendTracker,
}

impl Session {
    pub fn new(source: Arc<dyn ChannelSource>, fetch_options: FetchOptions) -> Self {
        Self {
            source,
            fetch_options,
            live_resource: "rt".to_string(),
            live_chunk_bytes: 4096,
            live_poll_interval: Duration::from_secs(1),
            historical: OnceCell::new(),
            tracker: TrendTracker::new(),
        }
    }

    pub fn from_config(source: Arc<dyn ChannelSource>, config: &Config) -> Self {
        let mut session = Self::new(source, config.feed.fetch_options()).with_live(
            config.feed.live_resource.clone(),
            config.feed.live_chunk_bytes,
            Duration::from_millis(config.feed.live_poll_ms),
        );
        session.tracker = TrendTracker::with_capacity(config.live.trend_capacity);
        session
    }

    pub fn with_live(
        mut self,
        resource: impl Into<String>,
        chunk_bytes: usize,
        poll_interval: Duration,
    ) -> Self {
        self.live_resource = resource.into();
        self.live_chunk_bytes = chunk_bytes;
        self.live_poll_interval = poll_interval;
        self
    }

    /// The historical dataset, fetched on first call and shared afterwards.
    pub async fn historical(&self) -> Arc<ParsedDataset> {
        self.historical
            .get_or_init(|| async {
                let dataset =
                    fetch::fetch_all(Arc::clone(&self.source), self.fetch_options.clone()).await;
                Arc::new(dataset)
            })
            .await
            .clone()
    }

    pub fn historical_ready(&self) -> bool {
        self.historical.initialized()
    }

    pub async fn window_series(&self, window: TimeWindow, now: NaiveDateTime) -> Vec<Tick> {
        let dataset = self.historical().await;
        aggregator::select_window(window, now, &dataset)
    }

    /// Unknown labels yield an empty series.
    pub async fn window_series_by_label(&self, label: &str, now: NaiveDateTime) -> Vec<Tick> {
        let dataset = self.historical().await;
        aggregator::select_window_by_label(label, now, &dataset)
    }

    pub fn open_live_feed(&self) -> Result<LiveFeed, FeedError> {
        let channel = self.source.open(&self.live_resource)?;
        Ok(LiveFeed::new(
            channel,
            self.live_chunk_bytes,
            self.live_poll_interval,
        ))
    }

    pub fn tracker(&self) -> &TrendTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut TrendTracker {
        &mut self.tracker
    }
}
