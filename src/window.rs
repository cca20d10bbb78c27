//! Named time windows and their resolution into concrete bounds.
//!
//! Each window maps to a [`WindowRule`] in a static table: a pure bounds
//! function of "now", the dataset it reads from, whether minute data may fill
//! gaps in hourly data, and whether it is a calendar period that can be "not
//! started yet".

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::model::tick::Resolution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeWindow {
    LastYear,
    CurrentYear,
    CurrentYearQ1,
    CurrentYearQ2,
    CurrentYearQ3,
    CurrentYearQ4,
    Last6Months,
    LastMonth,
    LastWeek,
    Yesterday,
    Today,
    Last12Hours,
    Last24Hours,
}

/// Inclusive bounds plus the dataset a window reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub source: Resolution,
    pub merge_minute_fallback: bool,
}

impl WindowBounds {
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Range(WindowBounds),
    /// Calendar period whose start lies after "now"; there is nothing to scan.
    NotStarted,
}

pub struct WindowRule {
    pub window: TimeWindow,
    pub label: &'static str,
    pub source: Resolution,
    pub merge_minute_fallback: bool,
    pub gate_on_start: bool,
    pub bounds: fn(NaiveDateTime) -> (NaiveDateTime, NaiveDateTime),
}

static WINDOW_RULES: [WindowRule; 13] = [
    WindowRule {
        window: TimeWindow::LastYear,
        label: "Last year",
        source: Resolution::Hour,
        merge_minute_fallback: true,
        gate_on_start: false,
        bounds: last_year,
    },
    WindowRule {
        window: TimeWindow::CurrentYear,
        label: "Current year",
        source: Resolution::Hour,
        merge_minute_fallback: true,
        gate_on_start: false,
        bounds: current_year,
    },
    WindowRule {
        window: TimeWindow::CurrentYearQ1,
        label: "Current year -> Q1",
        source: Resolution::Hour,
        merge_minute_fallback: true,
        gate_on_start: true,
        bounds: q1,
    },
    WindowRule {
        window: TimeWindow::CurrentYearQ2,
        label: "Current year -> Q2",
        source: Resolution::Hour,
        merge_minute_fallback: true,
        gate_on_start: true,
        bounds: q2,
    },
    WindowRule {
        window: TimeWindow::CurrentYearQ3,
        label: "Current year -> Q3",
        source: Resolution::Hour,
        merge_minute_fallback: true,
        gate_on_start: true,
        bounds: q3,
    },
    WindowRule {
        window: TimeWindow::CurrentYearQ4,
        label: "Current year -> Q4",
        source: Resolution::Hour,
        merge_minute_fallback: true,
        gate_on_start: true,
        bounds: q4,
    },
    WindowRule {
        window: TimeWindow::Last6Months,
        label: "Last 6 months",
        source: Resolution::Hour,
        merge_minute_fallback: false,
        gate_on_start: false,
        bounds: last_6_months,
    },
    WindowRule {
        window: TimeWindow::LastMonth,
        label: "Last month",
        source: Resolution::Minute,
        merge_minute_fallback: false,
        gate_on_start: false,
        bounds: last_month,
    },
    WindowRule {
        window: TimeWindow::LastWeek,
        label: "Last week",
        source: Resolution::Minute,
        merge_minute_fallback: false,
        gate_on_start: false,
        bounds: last_week,
    },
    WindowRule {
        window: TimeWindow::Yesterday,
        label: "Yesterday",
        source: Resolution::Second,
        merge_minute_fallback: false,
        gate_on_start: false,
        bounds: yesterday,
    },
    WindowRule {
        window: TimeWindow::Today,
        label: "Today",
        source: Resolution::Second,
        merge_minute_fallback: false,
        gate_on_start: false,
        bounds: today,
    },
    WindowRule {
        window: TimeWindow::Last12Hours,
        label: "Last 12hr",
        source: Resolution::Second,
        merge_minute_fallback: false,
        gate_on_start: false,
        bounds: last_12_hours,
    },
    WindowRule {
        window: TimeWindow::Last24Hours,
        label: "Last 24hr",
        source: Resolution::Second,
        merge_minute_fallback: false,
        gate_on_start: false,
        bounds: last_24_hours,
    },
];

impl TimeWindow {
    pub const ALL: [TimeWindow; 13] = [
        TimeWindow::LastYear,
        TimeWindow::CurrentYear,
        TimeWindow::CurrentYearQ1,
        TimeWindow::CurrentYearQ2,
        TimeWindow::CurrentYearQ3,
        TimeWindow::CurrentYearQ4,
        TimeWindow::Last6Months,
        TimeWindow::LastMonth,
        TimeWindow::LastWeek,
        TimeWindow::Yesterday,
        TimeWindow::Today,
        TimeWindow::Last12Hours,
        TimeWindow::Last24Hours,
    ];

    pub fn rule(self) -> &'static WindowRule {
        // Table order mirrors declaration order.
        &WINDOW_RULES[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.rule().label
    }

    /// Exact label lookup; unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        WINDOW_RULES
            .iter()
            .find(|rule| rule.label == label.trim())
            .map(|rule| rule.window)
    }

    pub fn resolve(self, now: NaiveDateTime) -> Resolved {
        let rule = self.rule();
        let (start, end) = (rule.bounds)(now);
        if rule.gate_on_start && now < start {
            return Resolved::NotStarted;
        }
        Resolved::Range(WindowBounds {
            start,
            end,
            source: rule.source,
            merge_minute_fallback: rule.merge_minute_fallback,
        })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("unknown time window '{}'", s))
    }
}

fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

fn day_end(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default())
}

/// `month` is 1-based; out-of-range dates fall back to Jan 1 of `year`.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| NaiveDate::from_ymd_opt(year, 1, 1))
        .unwrap_or(NaiveDate::MIN)
}

fn last_year(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let year = now.year() - 1;
    (day_start(ymd(year, 1, 1)), day_end(ymd(year, 12, 31)))
}

fn current_year(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (day_start(ymd(now.year(), 1, 1)), now)
}

fn q1(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (day_start(ymd(now.year(), 1, 1)), day_end(ymd(now.year(), 3, 31)))
}

fn q2(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (day_start(ymd(now.year(), 4, 1)), day_end(ymd(now.year(), 6, 30)))
}

fn q3(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (day_start(ymd(now.year(), 7, 1)), day_end(ymd(now.year(), 9, 30)))
}

fn q4(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (day_start(ymd(now.year(), 10, 1)), now)
}

fn last_6_months(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (now - Duration::days(6 * 30), now)
}

/// First and last day of the calendar month before `now`'s; January rolls back
/// to December of the previous year.
fn last_month(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let (year, month) = if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    };
    let first = ymd(year, month, 1);
    let last = ymd(now.year(), now.month(), 1)
        .pred_opt()
        .unwrap_or(first);
    (day_start(first), day_end(last))
}

fn last_week(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (now - Duration::days(7), now)
}

fn yesterday(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let day = (now - Duration::days(1)).date();
    (day_start(day), day_end(day))
}

fn today(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (day_start(now.date()), now)
}

fn last_12_hours(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (now - Duration::hours(12), now)
}

fn last_24_hours(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (now - Duration::hours(24), now)
}
