use fx_feed::model::quote::LiveQuote;
use fx_feed::trend::{board, TrendSeries, TrendTracker, TREND_CAPACITY};

fn row<'a>(rows: &'a [LiveQuote], symbol: &str) -> &'a LiveQuote {
    rows.iter()
        .find(|r| r.symbol == symbol)
        .unwrap_or_else(|| panic!("no row for {}", symbol))
}

#[test]
fn first_sighting_reports_zero_change() {
    let mut tracker = TrendTracker::new();
    let rows = tracker.ingest("!20240101,10:00\nEURUSD,1.0990,x\n");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].change, 0.0);
    assert_eq!(rows[0].pct_change, 0.0);
    assert_eq!(rows[0].trend, vec![1.099]);
}

#[test]
/// Change is measured against the last trend value; percent is relative to the new price.
fn change_and_pct_use_new_price_as_base() {
    let mut tracker = TrendTracker::new();
    tracker.ingest("EURUSD,1.0990,x\n");
    let rows = tracker.ingest("EURUSD,1.1000,x\n");
    let eur = row(&rows, "EURUSD");
    assert!((eur.change - 0.0010).abs() < 1e-9);
    assert!((eur.pct_change - 0.0010 / 1.1000 * 100.0).abs() < 1e-9);
    assert!((eur.pct_change - 0.0909).abs() < 1e-4);
    assert_eq!(eur.pct_change_label(), "0.09%");
    assert_eq!(eur.trend, vec![1.099, 1.1]);
}

#[test]
fn series_never_exceeds_capacity() {
    let mut tracker = TrendTracker::new();
    for i in 0..150 {
        tracker.ingest(&format!("EURUSD,{},x\n", 1.0 + i as f64 * 0.001));
    }
    let series = tracker.series("EURUSD").unwrap();
    assert_eq!(series.capacity(), TREND_CAPACITY);
    assert_eq!(series.len(), TREND_CAPACITY);
    let snapshot = tracker.snapshot("EURUSD");
    assert_eq!(snapshot.len(), TREND_CAPACITY);
    let expected: Vec<f64> = (50..150).map(|i| 1.0 + i as f64 * 0.001).collect();
    assert_eq!(snapshot, expected);
}

#[test]
/// Symbols seen before but missing from this read are carried forward unchanged.
fn absent_symbol_gets_synthesized_row() {
    let mut tracker = TrendTracker::new();
    tracker.ingest("EURUSD,1.10,x\nGBPUSD,1.27,x\n");
    tracker.ingest("GBPUSD,1.28,x\n");
    let rows = tracker.ingest("EURUSD,1.11,x\n");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].symbol, "EURUSD");
    let gbp = row(&rows, "GBPUSD");
    assert!((gbp.price - 1.28).abs() < f64::EPSILON);
    assert_eq!(gbp.change, 0.0);
    assert_eq!(gbp.pct_change, 0.0);
    assert_eq!(gbp.trend, vec![1.27, 1.28]);
    assert_eq!(tracker.snapshot("GBPUSD").len(), 2);
}

#[test]
fn malformed_lines_do_not_disturb_state() {
    let mut tracker = TrendTracker::new();
    tracker.ingest("EURUSD,1.10,x\n");
    let rows = tracker.ingest("EURUSD,1.1\nEURUSD,oops,x\nEUR");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].change, 0.0);
    assert_eq!(tracker.snapshot("EURUSD"), vec![1.10]);
}

#[test]
fn duplicate_symbol_in_one_read_chains_changes() {
    let mut tracker = TrendTracker::new();
    let rows = tracker.ingest("EURUSD,1.00,x\nEURUSD,1.02,x\n");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].change, 0.0);
    assert!((rows[1].change - 0.02).abs() < 1e-9);
    assert_eq!(rows[1].trend.len(), 2);
}

#[test]
fn extremes_and_feed_stamp_are_tracked() {
    let mut tracker = TrendTracker::new();
    tracker.ingest("!20240101,10:00:00\nEURUSD,1.10,x\n");
    tracker.ingest("EURUSD,1.15,x\n");
    tracker.ingest("EURUSD,1.05,x\n");

    let ext = tracker.extremes("EURUSD").unwrap();
    assert!((ext.high - 1.15).abs() < f64::EPSILON);
    assert!((ext.low - 1.05).abs() < f64::EPSILON);
    assert!(tracker.extremes("GBPUSD").is_none());

    let stamp = tracker.last_feed_stamp().unwrap();
    assert_eq!(stamp.time, "10:00:00");
}

#[test]
fn unknown_symbol_snapshot_is_empty() {
    let tracker = TrendTracker::new();
    assert!(tracker.snapshot("EURUSD").is_empty());
    assert!(tracker.series("EURUSD").is_none());
}

#[test]
fn board_filters_sorts_and_dedups() {
    let mut tracker = TrendTracker::new();
    let rows = tracker.ingest("USDCHF,0.90,x\nXAUUSD,2000,x\nEURUSD,1.10,x\nEURUSD,1.11,x\n");
    let watchlist = vec![
        "EURUSD".to_string(),
        "GBPUSD".to_string(),
        "USDCHF".to_string(),
    ];
    let shown = board(&rows, &watchlist);
    let symbols: Vec<&str> = shown.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["EURUSD", "USDCHF"]);
    assert!((shown[0].price - 1.10).abs() < f64::EPSILON);
}

#[test]
fn zero_capacity_is_clamped_to_one() {
    let series = TrendSeries::new(0);
    assert_eq!(series.capacity(), 1);
    assert!(series.is_empty());

    let mut tracker = TrendTracker::with_capacity(0);
    tracker.ingest("EURUSD,1.10,x\n");
    let rows = tracker.ingest("EURUSD,1.12,x\n");
    assert!((rows[0].change - 0.02).abs() < 1e-9);
    assert_eq!(tracker.snapshot("EURUSD"), vec![1.12]);
}

#[test]
fn tracked_symbols_are_listed_in_order() {
    let mut tracker = TrendTracker::new();
    assert_eq!(tracker.symbols().count(), 0);
    tracker.ingest("USDCHF,0.88,x\nEURUSD,1.10,x\n");
    let symbols: Vec<&str> = tracker.symbols().collect();
    assert_eq!(symbols, vec!["EURUSD", "USDCHF"]);
}
