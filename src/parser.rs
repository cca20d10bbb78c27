//! Line-protocol parsers for the quote feed.
//!
//! Every format mixes sentinel lines (`!` timestamp or `#` symbol) that set the
//! context for the data lines that follow. Data lines that do not split into
//! the expected number of fields, or whose price is not a number, are skipped:
//! the channel can hand over partial lines at buffer boundaries.

use crate::model::tick::Tick;

const TIMESTAMP_SENTINEL: char = '!';
const SYMBOL_SENTINEL: char = '#';

/// `date,time` carried by a live `!` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStamp {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LivePrice {
    pub symbol: String,
    pub price: f64,
}

/// Result of parsing one live read. Prices keep arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveBatch {
    pub stamp: Option<FeedStamp>,
    pub prices: Vec<LivePrice>,
}

fn lines(buffer: &str) -> impl Iterator<Item = &str> {
    buffer
        .lines()
        .map(|line| line.trim_matches(|c: char| c == '\r' || c == '\n'))
        .filter(|line| !line.trim().is_empty())
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

/// `SYMBOL,PRICE,ignored`, exactly three fields.
fn parse_symbol_price(line: &str) -> Option<LivePrice> {
    let mut fields = line.split(',');
    let (symbol, price, _ignored) = (fields.next()?, fields.next()?, fields.next()?);
    if fields.next().is_some() {
        return None;
    }
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return None;
    }
    Some(LivePrice {
        symbol: symbol.to_string(),
        price: parse_price(price)?,
    })
}

/// Splits the body of a `!date,time` header. Times given as `HH:MM` are padded to `HH:MM:SS`.
fn parse_stamp(body: &str) -> Option<FeedStamp> {
    let (date, time) = body.split_once(',')?;
    let date = date.trim();
    let mut time = time.trim().to_string();
    if date.is_empty() || time.is_empty() || time.contains(',') {
        return None;
    }
    if time.split(':').count() == 2 {
        time.push_str(":00");
    }
    Some(FeedStamp {
        date: date.to_string(),
        time,
    })
}

pub fn parse_live(buffer: &str) -> LiveBatch {
    let mut batch = LiveBatch::default();
    for line in lines(buffer) {
        if let Some(body) = line.strip_prefix(TIMESTAMP_SENTINEL) {
            if let Some(stamp) = parse_stamp(body) {
                batch.stamp = Some(stamp);
            }
            continue;
        }
        if let Some(price) = parse_symbol_price(line) {
            batch.prices.push(price);
        }
    }
    batch
}

/// Shared grammar of the second and minute history feeds.
///
/// A malformed header drops the previous context so that following rows are not
/// attributed to a stale timestamp.
fn parse_stamped_history(buffer: &str) -> Vec<Tick> {
    let mut out = Vec::new();
    let mut current: Option<FeedStamp> = None;

    for line in lines(buffer) {
        if let Some(body) = line.strip_prefix(TIMESTAMP_SENTINEL) {
            current = parse_stamp(body);
            continue;
        }
        let Some(stamp) = current.as_ref() else {
            continue;
        };
        let Some(LivePrice { symbol, price }) = parse_symbol_price(line) else {
            continue;
        };
        out.push(Tick {
            symbol,
            price,
            timestamp: format!("{} {}", stamp.date, stamp.time),
            date: stamp.date.clone(),
        });
    }
    out
}

pub fn parse_second_history(buffer: &str) -> Vec<Tick> {
    parse_stamped_history(buffer)
}

pub fn parse_minute_history(buffer: &str) -> Vec<Tick> {
    parse_stamped_history(buffer)
}

/// Hour history: `#SYMBOL` headers followed by `date,hour,price,ignored` rows.
pub fn parse_hour_history(buffer: &str) -> Vec<Tick> {
    let mut out = Vec::new();
    let mut symbol: Option<String> = None;

    for line in lines(buffer) {
        if let Some(body) = line.strip_prefix(SYMBOL_SENTINEL) {
            let body = body.trim();
            symbol = (!body.is_empty()).then(|| body.to_string());
            continue;
        }
        let Some(current) = symbol.as_ref() else {
            continue;
        };

        let fields: Vec<&str> = line.split(',').collect();
        let [date, hour, price, _ignored] = fields.as_slice() else {
            continue;
        };
        let (date, hour) = (date.trim(), hour.trim());
        if date.is_empty() || hour.is_empty() {
            continue;
        }
        let Some(price) = parse_price(price) else {
            continue;
        };
        out.push(Tick {
            symbol: current.clone(),
            price,
            timestamp: format!("{date} {hour}:00:00"),
            date: date.to_string(),
        });
    }
    out
}
