// =============================================================================
// Refresh Cycle — fetch → enrich → evaluate, per symbol, per tick
// =============================================================================
//
// One cycle walks the configured watch list sequentially. Every symbol is
// independent: a fetch failure, an empty response or a too-short history
// skips that symbol for the cycle and the rest proceed. The cycle always
// runs to completion before the next one is scheduled; there is no
// cancellation, a slow fetch simply delays the next tick.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::indicators::enrich::enrich;
use crate::market_data::MarketDataSource;
use crate::notify::Notify;
use crate::signals::evaluator::evaluate;

/// Run one refresh cycle over the current watch list.
pub async fn run_cycle(
    state: &Arc<AppState>,
    source: &dyn MarketDataSource,
    notifier: &dyn Notify,
) {
    let (symbols, interval) = {
        let config = state.runtime_config.read();
        (config.symbols.clone(), config.interval)
    };

    for symbol in &symbols {
        match source.fetch(symbol, interval).await {
            Ok(Some(bars)) => {
                let enriched = enrich(&bars);
                match evaluate(&enriched, symbol, &state.alerts, notifier).await {
                    Some(result) => {
                        debug!(
                            symbol,
                            message = %result.message,
                            severity = %result.severity,
                            "symbol evaluated"
                        );
                        state.record_signal(result, enriched);
                    }
                    None => {
                        debug!(symbol, bars = enriched.len(), "insufficient history; skipping");
                        state.clear_signal(symbol);
                    }
                }
            }
            Ok(None) => {
                debug!(symbol, "no data available; skipping");
                state.clear_signal(symbol);
            }
            Err(e) => {
                warn!(symbol, error = %e, "fetch failed; skipping symbol for this cycle");
                state.push_error(format!("fetch failed for {symbol}: {e}"));
                state.clear_signal(symbol);
            }
        }
    }

    state.finish_cycle();
}

/// Run refresh cycles forever, sleeping `refresh_secs` between them.
///
/// The interval is re-read from config on every tick so a config update
/// takes effect on the next cycle without a restart.
pub async fn run_monitor_loop(
    state: Arc<AppState>,
    source: Arc<dyn MarketDataSource>,
    notifier: Arc<dyn Notify>,
) {
    info!("monitor loop starting");

    loop {
        run_cycle(&state, source.as_ref(), notifier.as_ref()).await;

        let refresh_secs = state.runtime_config.read().refresh_secs.max(1);
        tokio::time::sleep(tokio::time::Duration::from_secs(refresh_secs)).await;
    }
}
