use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::channel::{ChannelSource, ReadChannel};
use crate::error::FeedError;
use crate::model::tick::{Resolution, Tick};
use crate::parser;

/// The three historical series. A `None` slot means that resolution's
/// pipeline failed; the other slots are unaffected.
#[derive(Debug, Clone, Default)]
pub struct ParsedDataset {
    pub second: Option<Vec<Tick>>,
    pub minute: Option<Vec<Tick>>,
    pub hour: Option<Vec<Tick>>,
}

impl ParsedDataset {
    pub fn get(&self, resolution: Resolution) -> Option<&[Tick]> {
        match resolution {
            Resolution::Second => self.second.as_deref(),
            Resolution::Minute => self.minute.as_deref(),
            Resolution::Hour => self.hour.as_deref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.second.is_some() && self.minute.is_some() && self.hour.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub second_resource: String,
    pub minute_resource: String,
    pub hour_resource: String,
    pub chunk_bytes: usize,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            second_resource: "hist1s".to_string(),
            minute_resource: "hist1m".to_string(),
            hour_resource: "hist1h".to_string(),
            chunk_bytes: 16_384,
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl FetchOptions {
    pub fn resource(&self, resolution: Resolution) -> &str {
        match resolution {
            Resolution::Second => &self.second_resource,
            Resolution::Minute => &self.minute_resource,
            Resolution::Hour => &self.hour_resource,
        }
    }
}

/// Drain a channel into a text buffer.
///
/// Stops at end-of-stream once nothing is left to read. `timeout` bounds the
/// total time since the call started and is checked only between reads, when
/// nothing is ready; once exceeded the partial buffer is returned and a
/// warning is logged.
pub async fn read_to_end(
    channel: &mut dyn ReadChannel,
    chunk_bytes: usize,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<String, FeedError> {
    let started = Instant::now();
    let mut buffer = String::new();

    loop {
        if channel.is_read_ready() {
            let chunk = channel.read(chunk_bytes)?;
            tracing::debug!(resource = channel.resource(), bytes = chunk.len(), "Read chunk");
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            tokio::task::yield_now().await;
            continue;
        }
        if channel.is_finished() {
            break;
        }
        if started.elapsed() > timeout {
            tracing::warn!(
                resource = channel.resource(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                buffered = buffer.len(),
                "Timeout reached while fetching; keeping partial buffer"
            );
            break;
        }
        tokio::time::sleep(poll_interval).await;
    }
    Ok(buffer)
}

fn parse_resolution(resolution: Resolution, buffer: &str) -> Vec<Tick> {
    match resolution {
        Resolution::Second => parser::parse_second_history(buffer),
        Resolution::Minute => parser::parse_minute_history(buffer),
        Resolution::Hour => parser::parse_hour_history(buffer),
    }
}

/// One pipeline: open, drain, close, parse.
pub async fn fetch_resolution(
    source: &dyn ChannelSource,
    resolution: Resolution,
    options: &FetchOptions,
) -> Result<Vec<Tick>, FeedError> {
    let resource = options.resource(resolution);
    tracing::info!(resource, resolution = resolution.label(), "Fetching historical data");

    let mut channel = source.open(resource)?;
    let drained = read_to_end(
        channel.as_mut(),
        options.chunk_bytes,
        options.timeout,
        options.poll_interval,
    )
    .await;
    channel.close();
    let buffer = drained?;

    let ticks = parse_resolution(resolution, &buffer);
    tracing::info!(
        resource,
        bytes = buffer.len(),
        ticks = ticks.len(),
        "Historical fetch completed"
    );
    Ok(ticks)
}

fn settle(
    resolution: Resolution,
    resource: &str,
    joined: Result<Result<Vec<Tick>, FeedError>, tokio::task::JoinError>,
) -> Option<Vec<Tick>> {
    let outcome = joined.unwrap_or_else(|e| {
        Err(FeedError::Task {
            resource: resource.to_string(),
            reason: e.to_string(),
        })
    });
    match outcome {
        Ok(ticks) => Some(ticks),
        Err(e) => {
            tracing::error!(
                resolution = resolution.label(),
                error = %e,
                "Historical pipeline failed"
            );
            None
        }
    }
}

/// Run the hour, minute and second pipelines concurrently and wait for all of
/// them. A failed pipeline leaves its slot empty without cancelling the others.
pub async fn fetch_all(source: Arc<dyn ChannelSource>, options: FetchOptions) -> ParsedDataset {
    let options = Arc::new(options);
    let spawn = |resolution: Resolution| {
        let source = Arc::clone(&source);
        let options = Arc::clone(&options);
        tokio::spawn(async move { fetch_resolution(source.as_ref(), resolution, &options).await })
    };

    let hour = spawn(Resolution::Hour);
    let minute = spawn(Resolution::Minute);
    let second = spawn(Resolution::Second);
    let (hour, minute, second) = tokio::join!(hour, minute, second);

    ParsedDataset {
        second: settle(Resolution::Second, &options.second_resource, second),
        minute: settle(Resolution::Minute, &options.minute_resource, minute),
        hour: settle(Resolution::Hour, &options.hour_resource, hour),
    }
}
