use fx_feed::parser::{
    parse_hour_history, parse_live, parse_minute_history, parse_second_history,
};

#[test]
fn minute_history_applies_header_to_following_rows() {
    let buf = "!20240101,10:30\r\nEURUSD,1.1000,x\r\nGBPUSD,1.2700,x\r\n!20240101,10:31:15\nEURUSD,1.1001,x\n";
    let ticks = parse_minute_history(buf);
    assert_eq!(ticks.len(), 3);
    assert_eq!(ticks[0].symbol, "EURUSD");
    assert_eq!(ticks[0].timestamp, "20240101 10:30:00");
    assert_eq!(ticks[0].date, "20240101");
    assert_eq!(ticks[1].timestamp, "20240101 10:30:00");
    assert_eq!(ticks[2].timestamp, "20240101 10:31:15");
    assert!((ticks[2].price - 1.1001).abs() < f64::EPSILON);
}

#[test]
/// Rows that precede the first header have no timestamp and are dropped.
fn second_history_skips_rows_before_first_header() {
    let buf = "EURUSD,1.1,x\n!20240101,09:00:01\nEURUSD,1.2,x\n";
    let ticks = parse_second_history(buf);
    assert_eq!(ticks.len(), 1);
    assert!((ticks[0].price - 1.2).abs() < f64::EPSILON);
}

#[test]
fn short_and_malformed_rows_are_skipped_without_stopping() {
    let buf = "!20240101,10:00\nEURUSD\nEURUSD,1.1\nEURUSD,abc,x\nEURUSD,1.1,x,extra\nGBPUSD,1.27,x\n";
    let ticks = parse_minute_history(buf);
    assert_eq!(ticks.len(), 1);
    assert_eq!(ticks[0].symbol, "GBPUSD");

    let hour = parse_hour_history("#EURUSD\n01.01.2024,10\n01.01.2024,10,1.1\n01.01.2024,11,1.2,x\n");
    assert_eq!(hour.len(), 1);
    assert_eq!(hour[0].timestamp, "01.01.2024 11:00:00");
}

#[test]
fn malformed_header_drops_previous_timestamp() {
    let buf = "!20240101,10:00\nEURUSD,1.1,x\n!garbage\nEURUSD,1.2,x\n!20240101,10:02\nEURUSD,1.3,x\n";
    let ticks = parse_minute_history(buf);
    let prices: Vec<f64> = ticks.iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![1.1, 1.3]);
}

#[test]
fn hour_history_uses_symbol_header() {
    let buf = "01.01.2024,09,1.0,x\n#EURUSD\n01.01.2024,10,1.1,x\n02.01.2024,11,1.2,x\n#GBPUSD \n01.01.2024,10,1.27,x\n";
    let ticks = parse_hour_history(buf);
    assert_eq!(ticks.len(), 3);
    assert_eq!(ticks[0].symbol, "EURUSD");
    assert_eq!(ticks[0].timestamp, "01.01.2024 10:00:00");
    assert_eq!(ticks[0].date, "01.01.2024");
    assert_eq!(ticks[1].timestamp, "02.01.2024 11:00:00");
    assert_eq!(ticks[2].symbol, "GBPUSD");
}

#[test]
/// Parsing a well-formed hour buffer and re-deriving (symbol, date, hour)
/// from each tick recovers the original header/row pairing.
fn hour_history_recovers_header_row_pairing() {
    let rows = [
        ("EURUSD", "01.01.2024", "10"),
        ("EURUSD", "01.01.2024", "11"),
        ("USDCHF", "03.01.2024", "23"),
    ];
    let mut buf = String::new();
    let mut current = "";
    for (symbol, date, hour) in rows {
        if symbol != current {
            buf.push_str(&format!("#{}\n", symbol));
            current = symbol;
        }
        buf.push_str(&format!("{},{},1.5,0\n", date, hour));
    }

    let ticks = parse_hour_history(&buf);
    let derived: Vec<(String, String, String)> = ticks
        .iter()
        .map(|t| {
            let (date, time) = t.timestamp.split_once(' ').unwrap();
            let hour = time.split(':').next().unwrap();
            assert_eq!(date, t.date);
            (t.symbol.clone(), date.to_string(), hour.to_string())
        })
        .collect();
    let expected: Vec<(String, String, String)> = rows
        .iter()
        .map(|(s, d, h)| (s.to_string(), d.to_string(), h.to_string()))
        .collect();
    assert_eq!(derived, expected);
}

#[test]
fn live_batch_keeps_order_and_last_header() {
    let batch = parse_live("!20240101,10:00\nEURUSD,1.1,x\nEURU\nGBPUSD,1.27,x\n!20240101,10:00:01\n");
    assert_eq!(batch.prices.len(), 2);
    assert_eq!(batch.prices[0].symbol, "EURUSD");
    assert_eq!(batch.prices[1].symbol, "GBPUSD");
    let stamp = batch.stamp.unwrap();
    assert_eq!(stamp.date, "20240101");
    assert_eq!(stamp.time, "10:00:01");
}

#[test]
fn empty_buffers_parse_to_nothing() {
    assert!(parse_live("").prices.is_empty());
    assert!(parse_minute_history("\n\n").is_empty());
    assert!(parse_hour_history("").is_empty());
}
