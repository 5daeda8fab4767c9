// =============================================================================
// Vigil — Multi-Indicator Market Monitor — Main Entry Point
// =============================================================================
//
// Watches a configurable list of symbols, classifies a Bollinger + MACD +
// dual-EMA signal state per symbol every refresh cycle, and pushes a Telegram
// alert the first time a new qualifying signal appears. A read-only REST API
// serves the latest results to a dashboard.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod indicators;
mod market_data;
mod monitor;
mod notify;
mod runtime_config;
mod signals;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::{MarketDataSource, YahooChartClient};
use crate::notify::{Notify, TelegramNotifier};
use crate::runtime_config::RuntimeConfig;
use crate::types::Interval;

/// On-disk location of the runtime configuration.
const CONFIG_PATH: &str = "vigil_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Vigil Market Monitor — Starting Up               ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    // ── 2. Configuration ─────────────────────────────────────────────────
    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Override watch list and interval from env if available.
    if let Ok(symbols) = std::env::var("VIGIL_SYMBOLS") {
        config.set_symbols_from_text(&symbols);
    }
    if let Ok(token) = std::env::var("VIGIL_INTERVAL") {
        match Interval::parse(&token) {
            Some(interval) => config.interval = interval,
            None => warn!(token = %token, "VIGIL_INTERVAL not one of 1m/2m/5m — keeping configured value"),
        }
    }

    info!(
        symbols = ?config.symbols,
        interval = %config.interval,
        refresh_secs = config.refresh_secs,
        "watch list configured"
    );

    // ── 3. Notifier (fatal when unconfigured) ────────────────────────────
    // The monitor exists to alert; without a notification channel there is
    // nothing meaningful to run.
    let notifier = Arc::new(
        TelegramNotifier::from_env()
            .context("Telegram credentials are required — set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID")?,
    );

    // ── 4. Shared state & data source ────────────────────────────────────
    let state = Arc::new(AppState::new(config));
    let source: Arc<dyn MarketDataSource> = Arc::new(YahooChartClient::new());

    // ── 5. REST API server ───────────────────────────────────────────────
    let api_state = state.clone();
    let bind_addr = std::env::var("VIGIL_BIND_ADDR")
        .unwrap_or_else(|_| state.runtime_config.read().bind_addr.clone());
    let bind_addr_clone = bind_addr.clone();

    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr_clone)
            .await
            .expect("Failed to bind API server");
        info!(addr = %bind_addr_clone, "API server listening");
        axum::serve(listener, app)
            .await
            .expect("API server failed");
    });

    // ── 6. Monitor loop ──────────────────────────────────────────────────
    let loop_state = state.clone();
    let loop_notifier: Arc<dyn Notify> = notifier.clone();
    tokio::spawn(async move {
        monitor::run_monitor_loop(loop_state, source, loop_notifier).await;
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 7. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("Vigil monitor shut down complete.");
    Ok(())
}
