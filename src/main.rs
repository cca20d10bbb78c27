use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};

use fx_feed::aggregator::for_symbol;
use fx_feed::config::Config;
use fx_feed::live::market_closed;
use fx_feed::model::quote::LiveQuote;
use fx_feed::session::Session;
use fx_feed::trend::board;
use fx_feed::window::TimeWindow;

const DEFAULT_WINDOW: TimeWindow = TimeWindow::LastWeek;
const LIVE_UPDATE_BUFFER: usize = 64;

fn init_tracing(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(config.logging.level.as_str())
            }),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .json()
        .init();
}

/// `fx-feed [window label] [symbol]`
#[tokio::main]
async fn main() -> Result<()> {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Set FX_FEED_CONFIG or create config/default.toml");
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let watchlist = config.live.watchlist();
    let window_label = args
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_WINDOW.label().to_string());
    let symbol = args
        .get(1)
        .map(|s| s.trim().to_ascii_uppercase())
        .or_else(|| watchlist.first().cloned())
        .unwrap_or_default();

    tracing::info!(
        program = %config.channel.program,
        window = %window_label,
        symbol = %symbol,
        "Starting fx-feed"
    );

    let source = Arc::new(config.channel.command_source());
    let mut session = Session::from_config(source, &config);

    let now = chrono::Local::now().naive_local();
    let dataset = session.historical().await;
    if !dataset.is_complete() {
        tracing::warn!(
            second = dataset.second.is_some(),
            minute = dataset.minute.is_some(),
            hour = dataset.hour.is_some(),
            "Historical dataset incomplete; windows over a missing resolution will be empty"
        );
    }
    let series = for_symbol(
        &session.window_series_by_label(&window_label, now).await,
        &symbol,
    );
    tracing::info!(window = %window_label, ticks = series.len(), "Historical series selected");
    for tick in &series {
        println!("{}", serde_json::to_string(tick).context("failed to encode tick")?);
    }

    if market_closed(now.date()) {
        tracing::info!("Market is closed on weekends; live updates resume on Monday");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ctrl_c_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Ctrl+C received");
        let _ = ctrl_c_shutdown.send(true);
    });

    let (updates_tx, mut updates_rx) = mpsc::channel::<Vec<LiveQuote>>(LIVE_UPDATE_BUFFER);
    let board_symbols = watchlist;
    let printer = tokio::spawn(async move {
        while let Some(rows) = updates_rx.recv().await {
            for row in board(&rows, &board_symbols) {
                match serde_json::to_string(&row) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!(error = %e, "Failed to encode live quote"),
                }
            }
        }
    });

    let feed = session
        .open_live_feed()
        .context("failed to open live channel")?;
    let stats = feed
        .run(session.tracker_mut(), updates_tx, shutdown_rx)
        .await
        .context("live feed failed")?;
    printer.await.ok();

    for sym in session.tracker().symbols() {
        if let Some(ext) = session.tracker().extremes(sym) {
            tracing::info!(symbol = %sym, high = ext.high, low = ext.low, "Session range");
        }
    }
    tracing::info!(polls = stats.polls, batches = stats.batches, "Shutdown complete");
    Ok(())
}
