//! Window selection over the parsed historical datasets.
//!
//! Hourly windows can fill gaps with minute data averaged into hourly buckets;
//! when both resolutions cover a bucket for the same symbol the hourly tick wins.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;

use crate::fetch::ParsedDataset;
use crate::model::tick::{floor_to_hour, Resolution, Tick};
use crate::window::{Resolved, TimeWindow, WindowBounds};

/// Ticks of `resolution` whose parsed timestamp lies inside `[start, end]`.
/// Ticks with unparseable timestamps are dropped.
pub fn filter_range(
    ticks: &[Tick],
    resolution: Resolution,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<Tick> {
    ticks
        .iter()
        .filter(|tick| {
            tick.parsed_time(resolution)
                .is_some_and(|ts| start <= ts && ts <= end)
        })
        .cloned()
        .collect()
}

#[derive(Default)]
struct BucketSum {
    sum: f64,
    count: usize,
}

/// Average minute ticks inside `[start, end]` per `(hour, symbol)` bucket.
pub fn minute_hourly_averages(
    minute: &[Tick],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<(NaiveDateTime, Tick)> {
    let mut buckets: BTreeMap<(NaiveDateTime, String), BucketSum> = BTreeMap::new();
    for tick in minute {
        let Some(ts) = tick.parsed_time(Resolution::Minute) else {
            continue;
        };
        if ts < start || ts > end {
            continue;
        }
        let bucket = buckets
            .entry((floor_to_hour(ts), tick.symbol.clone()))
            .or_default();
        bucket.sum += tick.price;
        bucket.count += 1;
    }

    buckets
        .into_iter()
        .map(|((hour, symbol), bucket)| {
            let avg = bucket.sum / bucket.count as f64;
            (hour, Tick::hourly(symbol, avg, hour))
        })
        .collect()
}

/// Combine already-filtered hourly ticks with minute-derived buckets the hourly
/// data does not cover, sorted ascending by time.
pub fn merge_minute_fallback(
    hourly: Vec<Tick>,
    minute: &[Tick],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<Tick> {
    let mut keyed: Vec<(NaiveDateTime, Tick)> = hourly
        .into_iter()
        .filter_map(|tick| tick.parsed_time(Resolution::Hour).map(|ts| (ts, tick)))
        .collect();

    let covered: HashSet<(NaiveDateTime, String)> = keyed
        .iter()
        .map(|(ts, tick)| (*ts, tick.symbol.clone()))
        .collect();

    let fallback = minute_hourly_averages(minute, start, end);
    let before = keyed.len();
    keyed.extend(
        fallback
            .into_iter()
            .filter(|(hour, tick)| !covered.contains(&(*hour, tick.symbol.clone()))),
    );
    tracing::debug!(
        hourly = before,
        filled = keyed.len() - before,
        "Merged minute fallback into hourly series"
    );

    keyed.sort_by_key(|(ts, _)| *ts);
    keyed.into_iter().map(|(_, tick)| tick).collect()
}

/// Apply resolved bounds to the dataset the window reads from.
///
/// Only the window's own resolution is required. A merge window whose minute
/// data is unavailable falls back to the plain hourly filter.
pub fn select_bounds(bounds: &WindowBounds, dataset: &ParsedDataset) -> Vec<Tick> {
    let Some(source) = dataset.get(bounds.source) else {
        tracing::debug!(
            resolution = bounds.source.label(),
            "Source resolution unavailable, no series"
        );
        return Vec::new();
    };
    let filtered = filter_range(source, bounds.source, bounds.start, bounds.end);
    if !bounds.merge_minute_fallback || bounds.source != Resolution::Hour {
        return filtered;
    }
    match dataset.get(Resolution::Minute) {
        Some(minute) => merge_minute_fallback(filtered, minute, bounds.start, bounds.end),
        None => {
            tracing::debug!("Minute data unavailable, hourly series not merged");
            filtered
        }
    }
}

/// Series for `window` at `now`. Empty when the period has not started or when
/// the resolution the window reads from is unavailable.
pub fn select_window(
    window: TimeWindow,
    now: NaiveDateTime,
    dataset: &ParsedDataset,
) -> Vec<Tick> {
    match window.resolve(now) {
        Resolved::Range(bounds) => select_bounds(&bounds, dataset),
        Resolved::NotStarted => {
            tracing::debug!(window = %window, "Window period has not started");
            Vec::new()
        }
    }
}

/// Label-based lookup; unknown labels produce an empty series.
pub fn select_window_by_label(
    label: &str,
    now: NaiveDateTime,
    dataset: &ParsedDataset,
) -> Vec<Tick> {
    match TimeWindow::from_label(label) {
        Some(window) => select_window(window, now, dataset),
        None => {
            tracing::debug!(label, "Unknown time window");
            Vec::new()
        }
    }
}

pub fn for_symbol(ticks: &[Tick], symbol: &str) -> Vec<Tick> {
    ticks
        .iter()
        .filter(|tick| tick.symbol == symbol)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn averages_group_by_hour_and_symbol() {
        let minute = vec![
            Tick::new("EURUSD", 1.0, "20240101 10:05:00", "20240101"),
            Tick::new("EURUSD", 2.0, "20240101 10:20:00", "20240101"),
            Tick::new("GBPUSD", 5.0, "20240101 10:20:00", "20240101"),
            Tick::new("EURUSD", 9.0, "20240101 11:00:00", "20240101"),
        ];
        let out = minute_hourly_averages(&minute, at(2024, 1, 1, 0, 0), at(2024, 1, 1, 23, 0));
        assert_eq!(out.len(), 3);
        let (hour, eur) = &out[0];
        assert_eq!(*hour, at(2024, 1, 1, 10, 0));
        assert_eq!(eur.symbol, "EURUSD");
        assert!((eur.price - 1.5).abs() < 1e-12);
        assert_eq!(eur.timestamp, "01.01.2024 10:00:00");
    }

    #[test]
    fn out_of_range_minutes_are_ignored() {
        let minute = vec![Tick::new("EURUSD", 1.0, "20231231 23:59:00", "20231231")];
        let out = minute_hourly_averages(&minute, at(2024, 1, 1, 0, 0), at(2024, 1, 2, 0, 0));
        assert!(out.is_empty());
    }
}
