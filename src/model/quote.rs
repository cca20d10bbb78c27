use serde::Serialize;

/// One row of the live table: latest price, change against the previous
/// trend value, and a copy of the symbol's trend at the time of the poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub pct_change: f64,
    pub trend: Vec<f64>,
}

impl LiveQuote {
    /// `% change` as the live table shows it, e.g. `0.09%`.
    pub fn pct_change_label(&self) -> String {
        format!("{:.2}%", self.pct_change)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceExtremes {
    pub high: f64,
    pub low: f64,
}

impl PriceExtremes {
    pub fn new(price: f64) -> Self {
        let mut extremes = Self {
            high: f64::MIN,
            low: f64::INFINITY,
        };
        extremes.update(price);
        extremes
    }

    /// Non-positive prices can raise the high but never lower the low.
    pub fn update(&mut self, price: f64) {
        self.high = self.high.max(price);
        if price > 0.0 {
            self.low = self.low.min(price);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pct_label_has_two_decimals() {
        let quote = LiveQuote {
            symbol: "EURUSD".to_string(),
            price: 1.1,
            change: 0.001,
            pct_change: 0.0909090909,
            trend: vec![1.099, 1.1],
        };
        assert_eq!(quote.pct_change_label(), "0.09%");
    }

    #[test]
    fn extremes_ignore_non_positive_lows() {
        let mut ext = PriceExtremes::new(1.2);
        ext.update(1.3);
        ext.update(0.0);
        ext.update(1.1);
        assert!((ext.high - 1.3).abs() < f64::EPSILON);
        assert!((ext.low - 1.1).abs() < f64::EPSILON);
    }
}
