// =============================================================================
// MACD (Moving Average Convergence Divergence)
// =============================================================================
//
//   MACD      = EMA(fast span) − EMA(slow span)      of close
//   Signal    = EMA(signal span)                     of MACD
//   Histogram = MACD − Signal
//
// All three EMAs use the same seed-with-first-observation convention as
// [`crate::indicators::ema::ema_series`], so every column is defined from the
// first bar onward (and settles only after the slow span has warmed up).

use crate::indicators::ema::ema_series;

/// Per-bar MACD columns for a close series. All vectors have the same length
/// as the input.
#[derive(Debug, Clone)]
pub struct MacdColumns {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Compute the MACD column set for `closes`.
pub fn macd_columns(
    closes: &[f64],
    fast_span: usize,
    slow_span: usize,
    signal_span: usize,
) -> MacdColumns {
    let fast = ema_series(closes, fast_span);
    let slow = ema_series(closes, slow_span);

    let macd: Vec<f64> = fast
        .iter()
        .zip(slow.iter())
        .map(|(f, s)| f - s)
        .collect();

    let signal = ema_series(&macd, signal_span);

    let histogram: Vec<f64> = macd
        .iter()
        .zip(signal.iter())
        .map(|(m, s)| m - s)
        .collect();

    MacdColumns {
        macd,
        signal,
        histogram,
    }
}
