use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::model::quote::{LiveQuote, PriceExtremes};
use crate::parser::{self, FeedStamp, LivePrice};

pub const TREND_CAPACITY: usize = 100;

/// Bounded FIFO of prices. Pushing past capacity evicts the oldest value.
#[derive(Debug, Clone)]
pub struct TrendSeries {
    capacity: usize,
    values: VecDeque<f64>,
}

impl TrendSeries {
    /// A zero capacity is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, price: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(price);
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

/// Live-quote state for every symbol seen on the feed.
///
/// Series are created on first sighting and never dropped. All mutation goes
/// through [`TrendTracker::ingest`], so a single owner serializes updates.
#[derive(Debug)]
pub struct TrendTracker {
    capacity: usize,
    series: BTreeMap<String, TrendSeries>,
    extremes: BTreeMap<String, PriceExtremes>,
    last_stamp: Option<FeedStamp>,
}

impl Default for TrendTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendTracker {
    pub fn new() -> Self {
        Self::with_capacity(TREND_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: BTreeMap::new(),
            extremes: BTreeMap::new(),
            last_stamp: None,
        }
    }

    /// Parse one live read and return a row per parsed price, followed by a
    /// carried-forward row for every known symbol absent from this read.
    pub fn ingest(&mut self, raw: &str) -> Vec<LiveQuote> {
        let batch = parser::parse_live(raw);
        if batch.stamp.is_some() {
            self.last_stamp = batch.stamp;
        }

        let mut rows = Vec::with_capacity(batch.prices.len().max(self.series.len()));
        let mut seen: HashSet<String> = HashSet::new();

        for LivePrice { symbol, price } in batch.prices {
            let change = match self.series.get_mut(&symbol) {
                Some(series) => {
                    let change = series.last().map_or(0.0, |prev| price - prev);
                    series.push(price);
                    change
                }
                None => {
                    let mut series = TrendSeries::new(self.capacity);
                    series.push(price);
                    self.series.insert(symbol.clone(), series);
                    0.0
                }
            };
            let trend = self.snapshot(&symbol);
            seen.insert(symbol.clone());
            rows.push(LiveQuote {
                symbol,
                price,
                change,
                pct_change: pct_of_new_price(change, price),
                trend,
            });
        }

        for (symbol, series) in &self.series {
            if seen.contains(symbol) {
                continue;
            }
            let Some(price) = series.last() else {
                continue;
            };
            rows.push(LiveQuote {
                symbol: symbol.clone(),
                price,
                change: 0.0,
                pct_change: 0.0,
                trend: series.to_vec(),
            });
        }

        for row in &rows {
            self.extremes
                .entry(row.symbol.clone())
                .and_modify(|ext| ext.update(row.price))
                .or_insert_with(|| PriceExtremes::new(row.price));
        }
        rows
    }

    /// Copy of the symbol's trend; empty for symbols never seen.
    pub fn snapshot(&self, symbol: &str) -> Vec<f64> {
        self.series
            .get(symbol)
            .map(TrendSeries::to_vec)
            .unwrap_or_default()
    }

    pub fn series(&self, symbol: &str) -> Option<&TrendSeries> {
        self.series.get(symbol)
    }

    pub fn extremes(&self, symbol: &str) -> Option<PriceExtremes> {
        self.extremes.get(symbol).copied()
    }

    pub fn last_feed_stamp(&self) -> Option<&FeedStamp> {
        self.last_stamp.as_ref()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}

/// Percent change relative to the new price, matching the feed's historical
/// display. A zero price reports no change.
fn pct_of_new_price(change: f64, price: f64) -> f64 {
    if price == 0.0 {
        return 0.0;
    }
    change / price * 100.0
}

/// Rows for the watchlist only, sorted by symbol, first row per symbol kept.
pub fn board(rows: &[LiveQuote], watchlist: &[String]) -> Vec<LiveQuote> {
    let mut picked: BTreeMap<&str, &LiveQuote> = BTreeMap::new();
    for row in rows {
        if watchlist.iter().any(|s| s == &row.symbol) {
            picked.entry(row.symbol.as_str()).or_insert(row);
        }
    }
    picked.into_values().cloned().collect()
}
