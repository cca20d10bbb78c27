use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;

/// Timestamp layout of second and minute history (`YYYYMMDD HH:MM:SS`).
pub const INTRADAY_TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M:%S";
/// Timestamp layout of hour history (`DD.MM.YYYY HH:MM:SS`).
pub const HOURLY_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";
pub const HOURLY_DATE_FORMAT: &str = "%d.%m.%Y";

/// Granularity of a historical dataset. Each resolution carries its own
/// timestamp layout, so timestamps must be compared through [`Resolution::parse_timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Second,
    Minute,
    Hour,
}

impl Resolution {
    pub fn timestamp_format(self) -> &'static str {
        match self {
            Resolution::Second | Resolution::Minute => INTRADAY_TIMESTAMP_FORMAT,
            Resolution::Hour => HOURLY_TIMESTAMP_FORMAT,
        }
    }

    pub fn parse_timestamp(self, raw: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(raw.trim(), self.timestamp_format()).ok()
    }

    pub fn label(self) -> &'static str {
        match self {
            Resolution::Second => "second",
            Resolution::Minute => "minute",
            Resolution::Hour => "hour",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub timestamp: String,
    pub date: String,
}

impl Tick {
    pub fn new(
        symbol: impl Into<String>,
        price: f64,
        timestamp: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp: timestamp.into(),
            date: date.into(),
        }
    }

    /// Build an hourly tick for the bucket starting at `hour`, in the hour-history layout.
    pub fn hourly(symbol: impl Into<String>, price: f64, hour: NaiveDateTime) -> Self {
        let bucket = floor_to_hour(hour);
        Self {
            symbol: symbol.into(),
            price,
            timestamp: bucket.format(HOURLY_TIMESTAMP_FORMAT).to_string(),
            date: bucket.format(HOURLY_DATE_FORMAT).to_string(),
        }
    }

    pub fn parsed_time(&self, resolution: Resolution) -> Option<NaiveDateTime> {
        resolution.parse_timestamp(&self.timestamp)
    }
}

pub fn floor_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn each_resolution_parses_its_own_layout() {
        let intraday = Resolution::Minute.parse_timestamp("20240105 10:30:00").unwrap();
        let hourly = Resolution::Hour.parse_timestamp("05.01.2024 10:30:00").unwrap();
        assert_eq!(intraday, hourly);

        assert!(Resolution::Hour.parse_timestamp("20240105 10:30:00").is_none());
        assert!(Resolution::Second.parse_timestamp("05.01.2024 10:30:00").is_none());
    }

    #[test]
    fn hourly_tick_is_floored_and_formatted() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 20, 45)
            .unwrap();
        let tick = Tick::hourly("EURUSD", 1.1, ts);
        assert_eq!(tick.timestamp, "01.01.2024 10:00:00");
        assert_eq!(tick.date, "01.01.2024");
        assert_eq!(
            tick.parsed_time(Resolution::Hour),
            Some(floor_to_hour(ts))
        );
    }
}
