// =============================================================================
// Shared types used across the Vigil monitoring engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Candle interval the monitor polls at. Restricted to the granularities the
/// upstream chart endpoint serves for intraday history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
}

impl Interval {
    /// The wire token understood by the chart API (`1m`, `2m`, `5m`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::TwoMinutes => "2m",
            Self::FiveMinutes => "5m",
        }
    }

    /// Parse a user-supplied interval token. Unknown tokens yield `None` so
    /// the caller can fall back to the configured value.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "1m" => Some(Self::OneMinute),
            "2m" => Some(Self::TwoMinutes),
            "5m" => Some(Self::FiveMinutes),
            _ => None,
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::OneMinute
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How loudly a signal should be surfaced on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Self::Info
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Whether the last close sits inside or outside the Bollinger channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandPosition {
    Inside,
    Outside,
}

impl std::fmt::Display for BandPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inside => write!(f, "inside"),
            Self::Outside => write!(f, "outside"),
        }
    }
}

/// MACD histogram direction on the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacdStatus {
    Bullish,
    Bearish,
}

impl std::fmt::Display for MacdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
        }
    }
}

/// Fast-vs-slow EMA ordering on the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Bullish,
    Bearish,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
        }
    }
}

/// Structured outcome of one signal evaluation for one symbol. This is the
/// only object the rendering layer consumes per symbol per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalResult {
    pub symbol: String,
    /// Close of the most recent bar.
    pub price: f64,
    pub bb_position: BandPosition,
    pub macd_status: MacdStatus,
    pub trend: TrendDirection,
    /// Human-readable signal label after the full override chain.
    pub message: String,
    pub severity: Severity,
    /// ISO 8601 timestamp of the evaluation.
    pub evaluated_at: String,
}
