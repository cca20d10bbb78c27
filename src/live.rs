use std::time::Duration;

use chrono::{Datelike, NaiveDate, Weekday};
use tokio::sync::{mpsc, watch};

use crate::channel::ReadChannel;
use crate::error::FeedError;
use crate::model::quote::LiveQuote;
use crate::trend::TrendTracker;

/// The FX market publishes no live quotes on weekends.
pub fn market_closed(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveStats {
    pub polls: u64,
    pub batches: u64,
    pub dropped: u64,
}

/// Polls the live channel and feeds each read into a [`TrendTracker`].
pub struct LiveFeed {
    channel: Box<dyn ReadChannel>,
    chunk_bytes: usize,
    poll_interval: Duration,
}

impl LiveFeed {
    pub fn new(channel: Box<dyn ReadChannel>, chunk_bytes: usize, poll_interval: Duration) -> Self {
        Self {
            channel,
            chunk_bytes,
            poll_interval,
        }
    }

    /// Run until `shutdown` flips to true or the channel ends.
    ///
    /// The tracker is borrowed exclusively for the whole loop. Rows go out with
    /// `try_send`; if the consumer lags the update is dropped and counted.
    pub async fn run(
        mut self,
        tracker: &mut TrendTracker,
        updates: mpsc::Sender<Vec<LiveQuote>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<LiveStats, FeedError> {
        let mut stats = LiveStats::default();
        tracing::info!(resource = self.channel.resource(), "Live feed started");

        let outcome = loop {
            if *shutdown.borrow() {
                break Ok(());
            }
            stats.polls += 1;

            if self.channel.is_read_ready() {
                let chunk = match self.channel.read(self.chunk_bytes) {
                    Ok(chunk) => chunk,
                    Err(e) => break Err(e),
                };
                let rows = tracker.ingest(&String::from_utf8_lossy(&chunk));
                if !rows.is_empty() {
                    stats.batches += 1;
                    match updates.try_send(rows) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            stats.dropped += 1;
                            tracing::warn!("Live update channel full, dropping batch");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            tracing::info!("Live update receiver dropped");
                            break Ok(());
                        }
                    }
                }
            } else if self.channel.is_finished() {
                tracing::warn!(resource = self.channel.resource(), "Live channel ended");
                break Ok(());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                }
            }
        };

        self.channel.close();
        tracing::info!(
            polls = stats.polls,
            batches = stats.batches,
            dropped = stats.dropped,
            "Live feed stopped"
        );
        outcome.map(|()| stats)
    }
}
