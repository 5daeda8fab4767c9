// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators the monitor is
// built on: span EMAs, Bollinger Bands and MACD, plus the `enrich` step that
// attaches all derived columns to a raw bar series.  Rolling-window values
// are `Option<f64>` so callers are forced to handle the warm-up region.

pub mod bollinger;
pub mod ema;
pub mod enrich;
pub mod macd;
