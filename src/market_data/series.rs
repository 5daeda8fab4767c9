// ---------------------------------------------------------------------------
// Price series types and the data-source seam
// ---------------------------------------------------------------------------

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Interval;

/// A single OHLCV bar. A series is an ordered `Vec<PriceBar>` for one
/// (symbol, interval) pair, oldest first — the evaluator reads the last two
/// elements and a trailing window, so ordering is significant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bar open time, UNIX seconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Source of historical price series, polled once per symbol per cycle.
///
/// `Ok(None)` means "no data available right now" (unknown symbol, empty
/// response) and is NOT an error — the caller skips the symbol for the
/// cycle. `Err` is reserved for transport and protocol failures, which the
/// caller treats the same way but records in the error log.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch(&self, symbol: &str, interval: Interval) -> Result<Option<Vec<PriceBar>>>;
}
