// =============================================================================
// Runtime Configuration — Watch list and polling settings with atomic save
// =============================================================================
//
// Central configuration hub for the Vigil monitor: which symbols to watch,
// at which candle interval, and how often to run a refresh cycle.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::Interval;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "AAPL".to_string(),
        "NVDA".to_string(),
        "TSLA".to_string(),
        "BTC-USD".to_string(),
    ]
}

fn default_refresh_secs() -> u64 {
    60
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the Vigil monitor.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Symbols the monitor is watching.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Candle interval requested from the data source.
    #[serde(default)]
    pub interval: Interval,

    /// Seconds between refresh cycles. A cycle always runs to completion
    /// before the next one starts.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    /// Bind address for the read-only REST API.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            interval: Interval::default(),
            refresh_secs: default_refresh_secs(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            interval = %config.interval,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    ///
    /// This prevents corruption if the process crashes mid-write.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        // Atomic write: write to a temporary sibling file, then rename.
        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Replace the watch list from a free-text comma-separated input.
    ///
    /// An input that normalises to an empty list leaves the current list
    /// untouched, so a stray empty submit cannot wipe the watch list.
    pub fn set_symbols_from_text(&mut self, text: &str) {
        let parsed = parse_symbol_list(text);
        if !parsed.is_empty() {
            self.symbols = parsed;
        }
    }
}

/// Normalise a free-text symbol list: split on commas, trim whitespace,
/// uppercase, drop empties. No further validation — unknown tickers simply
/// fail to fetch and are skipped per cycle.
pub fn parse_symbol_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
