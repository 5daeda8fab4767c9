// =============================================================================
// Yahoo Finance Chart API Client — public REST, no authentication
// =============================================================================
//
// Fetches intraday OHLCV history from the v8 chart endpoint. MACD and the
// Bollinger window need a few dozen bars to stabilise, so every request asks
// for a fixed 5-day look-back regardless of interval.
//
// The endpoint reports unknown symbols and empty ranges inside the JSON body
// (`chart.error` / empty `result`), which this client maps to `Ok(None)` so
// the refresh cycle can skip the symbol without treating it as a failure.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::market_data::series::{MarketDataSource, PriceBar};
use crate::types::Interval;

/// Look-back window requested with every fetch.
const HISTORY_RANGE: &str = "5d";

/// Yahoo Finance chart API client.
#[derive(Debug, Clone)]
pub struct YahooChartClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooChartClient {
    /// Create a new client with a short per-request timeout so one
    /// unresponsive symbol cannot stall the refresh cycle.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .user_agent("Mozilla/5.0 (compatible; vigil-bot/1.0)")
            .build()
            .expect("failed to build reqwest client");

        debug!("YahooChartClient initialised (base_url=https://query1.finance.yahoo.com)");

        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            client,
        }
    }

    /// GET /v8/finance/chart/{symbol}.
    #[instrument(skip(self), name = "yahoo::get_chart")]
    async fn get_chart(&self, symbol: &str, interval: Interval) -> Result<Option<Vec<PriceBar>>> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval={}&range={}",
            self.base_url,
            symbol,
            interval.as_str(),
            HISTORY_RANGE
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse chart response")?;

        // Unknown symbols come back as 404 with a populated chart.error
        // object — that is "no data", not a transport failure.
        if status == reqwest::StatusCode::NOT_FOUND {
            warn!(symbol, "symbol not found on chart endpoint");
            return Ok(None);
        }

        if !status.is_success() {
            anyhow::bail!("chart endpoint returned {}: {}", status, body);
        }

        let bars = parse_chart_response(&body)?;
        if let Some(ref bars) = bars {
            debug!(symbol, interval = %interval, count = bars.len(), "chart history fetched");
        }
        Ok(bars)
    }
}

impl Default for YahooChartClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataSource for YahooChartClient {
    async fn fetch(&self, symbol: &str, interval: Interval) -> Result<Option<Vec<PriceBar>>> {
        self.get_chart(symbol, interval).await
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parse a v8 chart response body into a bar series.
///
/// Expected shape:
/// ```json
/// { "chart": { "result": [ {
///     "timestamp": [ 1700000000, ... ],
///     "indicators": { "quote": [ {
///         "open": [...], "high": [...], "low": [...],
///         "close": [...], "volume": [...]
///     } ] }
/// } ], "error": null } }
/// ```
///
/// Bars with a null open/high/low/close entry (halted or not-yet-traded
/// minutes) are dropped; a null volume is kept as 0.0. Returns `Ok(None)`
/// when the result set is absent or empty.
fn parse_chart_response(body: &serde_json::Value) -> Result<Option<Vec<PriceBar>>> {
    if !body["chart"]["error"].is_null() {
        warn!(error = %body["chart"]["error"], "chart endpoint reported an error");
        return Ok(None);
    }

    let result = match body["chart"]["result"].as_array().and_then(|r| r.first()) {
        Some(r) => r,
        None => return Ok(None),
    };

    let timestamps = match result["timestamp"].as_array() {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(None),
    };

    let quote = &result["indicators"]["quote"][0];
    let opens = quote["open"]
        .as_array()
        .context("chart response missing quote.open array")?;
    let highs = quote["high"]
        .as_array()
        .context("chart response missing quote.high array")?;
    let lows = quote["low"]
        .as_array()
        .context("chart response missing quote.low array")?;
    let closes = quote["close"]
        .as_array()
        .context("chart response missing quote.close array")?;
    let volumes = quote["volume"]
        .as_array()
        .context("chart response missing quote.volume array")?;

    let mut bars = Vec::with_capacity(timestamps.len());

    for (i, ts) in timestamps.iter().enumerate() {
        let timestamp = match ts.as_i64() {
            Some(t) => t,
            None => continue,
        };

        let ohlc = (
            opens.get(i).and_then(parse_quote_f64),
            highs.get(i).and_then(parse_quote_f64),
            lows.get(i).and_then(parse_quote_f64),
            closes.get(i).and_then(parse_quote_f64),
        );

        // Any null in OHLC invalidates the bar.
        let (open, high, low, close) = match ohlc {
            (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
            _ => continue,
        };

        let volume = volumes.get(i).and_then(parse_quote_f64).unwrap_or(0.0);

        bars.push(PriceBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if bars.is_empty() {
        return Ok(None);
    }
    Ok(Some(bars))
}

/// Quote arrays mix numbers and nulls; the occasional string sneaks in on
/// some listings, so accept both.
fn parse_quote_f64(val: &serde_json::Value) -> Option<f64> {
    match val {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chart_response_ok() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{
                "chart": {
                    "result": [ {
                        "timestamp": [1700000000, 1700000060, 1700000120],
                        "indicators": { "quote": [ {
                            "open":   [100.0, 101.0, 102.0],
                            "high":   [100.5, 101.5, 102.5],
                            "low":    [99.5, 100.5, 101.5],
                            "close":  [100.2, 101.2, 102.2],
                            "volume": [1000, 1100, null]
                        } ] }
                    } ],
                    "error": null
                }
            }"#,
        )
        .unwrap();

        let bars = parse_chart_response(&json).unwrap().unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp, 1_700_000_000);
        assert!((bars[1].close - 101.2).abs() < f64::EPSILON);
        // Null volume is kept as a zero-volume bar.
        assert!((bars[2].volume - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_chart_response_drops_null_ohlc_bars() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{
                "chart": {
                    "result": [ {
                        "timestamp": [1, 2],
                        "indicators": { "quote": [ {
                            "open":   [100.0, null],
                            "high":   [100.5, 101.5],
                            "low":    [99.5, 100.5],
                            "close":  [100.2, 101.2],
                            "volume": [1000, 1100]
                        } ] }
                    } ],
                    "error": null
                }
            }"#,
        )
        .unwrap();

        let bars = parse_chart_response(&json).unwrap().unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].timestamp, 1);
    }

    #[test]
    fn parse_chart_response_empty_result_is_none() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{ "chart": { "result": [], "error": null } }"#).unwrap();
        assert!(parse_chart_response(&json).unwrap().is_none());
    }

    #[test]
    fn parse_chart_response_error_body_is_none() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{ "chart": { "result": null,
                 "error": { "code": "Not Found", "description": "No data found" } } }"#,
        )
        .unwrap();
        assert!(parse_chart_response(&json).unwrap().is_none());
    }

    #[test]
    fn parse_quote_accepts_string_numbers() {
        assert_eq!(parse_quote_f64(&serde_json::json!("101.5")), Some(101.5));
        assert_eq!(parse_quote_f64(&serde_json::json!(2.0)), Some(2.0));
        assert_eq!(parse_quote_f64(&serde_json::json!(null)), None);
    }
}
