// =============================================================================
// Series Enrichment — raw bars + derived indicator columns
// =============================================================================
//
// `enrich` is the single entry point the refresh cycle calls before signal
// evaluation: it attaches Bollinger, MACD and trend-EMA columns to every bar.
// Deterministic, no I/O, total over any input (an empty series enriches to an
// empty series; short series carry `None` in the not-yet-defined windows).
//
// The parameter set is fixed — reproducing signal timing bit-for-bit matters
// more than tunability here.

use serde::{Deserialize, Serialize};

use crate::indicators::bollinger::bollinger_columns;
use crate::indicators::ema::ema_series;
use crate::indicators::macd::macd_columns;
use crate::market_data::PriceBar;

/// Bollinger window and band width.
pub const BB_WINDOW: usize = 20;
pub const BB_NUM_STD: f64 = 2.0;

/// MACD spans (fast/slow/signal).
pub const MACD_FAST_SPAN: usize = 12;
pub const MACD_SLOW_SPAN: usize = 26;
pub const MACD_SIGNAL_SPAN: usize = 9;

/// Trend EMA pair spans.
pub const EMA_FAST_SPAN: usize = 9;
pub const EMA_SLOW_SPAN: usize = 21;

/// One bar with every derived column attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedBar {
    pub bar: PriceBar,

    /// Bollinger columns; `None` during the first `BB_WINDOW − 1` bars.
    pub bb_mid: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,

    /// MACD columns; defined from bar 0, stable only after warm-up.
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,

    /// Trend EMA pair.
    pub ema_fast: f64,
    pub ema_slow: f64,
}

/// Attach all indicator columns to a raw bar series.
pub fn enrich(bars: &[PriceBar]) -> Vec<EnrichedBar> {
    if bars.is_empty() {
        return Vec::new();
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let bb = bollinger_columns(&closes, BB_WINDOW, BB_NUM_STD);
    let macd = macd_columns(&closes, MACD_FAST_SPAN, MACD_SLOW_SPAN, MACD_SIGNAL_SPAN);
    let ema_fast = ema_series(&closes, EMA_FAST_SPAN);
    let ema_slow = ema_series(&closes, EMA_SLOW_SPAN);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| EnrichedBar {
            bar: bar.clone(),
            bb_mid: bb.middle[i],
            bb_upper: bb.upper[i],
            bb_lower: bb.lower[i],
            macd: macd.macd[i],
            macd_signal: macd.signal[i],
            macd_hist: macd.histogram[i],
            ema_fast: ema_fast[i],
            ema_slow: ema_slow[i],
        })
        .collect()
}
