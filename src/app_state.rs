// =============================================================================
// Central Application State — Vigil Monitor
// =============================================================================
//
// The single source of truth for the process. The refresh cycle writes the
// latest per-symbol results here; the REST layer reads immutable snapshots
// out. Thread safety follows one pattern throughout:
//   - Atomic counters for lock-free version/cycle tracking.
//   - parking_lot::RwLock for all mutable shared collections.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::indicators::enrich::EnrichedBar;
use crate::runtime_config::RuntimeConfig;
use crate::signals::AlertState;
use crate::types::{Interval, SignalResult};

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Central application state shared across async tasks via `Arc<AppState>`.
pub struct AppState {
    /// Monotonically increasing version counter, incremented on every
    /// meaningful mutation so pollers can cheaply detect fresh data.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    // ── Signal pipeline ─────────────────────────────────────────────────
    /// Alert de-duplication state, owned by the evaluator alone.
    pub alerts: AlertState,
    /// Latest evaluation result per symbol.
    latest_signals: RwLock<HashMap<String, SignalResult>>,
    /// Latest enriched series per symbol, kept for charting clients.
    latest_series: RwLock<HashMap<String, Vec<EnrichedBar>>>,

    // ── Operational status ──────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,
    pub cycles_completed: AtomicU64,
    pub last_cycle_at: RwLock<Option<String>>,

    /// Instant when the monitor was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` from the given runtime configuration.
    /// The returned value is typically wrapped in `Arc` immediately.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            alerts: AlertState::new(),
            latest_signals: RwLock::new(HashMap::new()),
            latest_series: RwLock::new(HashMap::new()),
            recent_errors: RwLock::new(Vec::new()),
            cycles_completed: AtomicU64::new(0),
            last_cycle_at: RwLock::new(None),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version management ──────────────────────────────────────────────

    /// Atomically increment the state version.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted when the limit is
    /// reached.
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }

    // ── Signal snapshots ────────────────────────────────────────────────

    /// Store the latest evaluation outcome for a symbol.
    pub fn record_signal(&self, result: SignalResult, series: Vec<EnrichedBar>) {
        let symbol = result.symbol.clone();
        self.latest_signals.write().insert(symbol.clone(), result);
        self.latest_series.write().insert(symbol, series);
        self.increment_version();
    }

    /// Drop any stored result for a symbol that produced nothing this cycle,
    /// so the API never serves a stale classification as current.
    pub fn clear_signal(&self, symbol: &str) {
        let removed_signal = self.latest_signals.write().remove(symbol).is_some();
        let removed_series = self.latest_series.write().remove(symbol).is_some();
        if removed_signal || removed_series {
            self.increment_version();
        }
    }

    /// Latest result for one symbol.
    pub fn signal(&self, symbol: &str) -> Option<SignalResult> {
        self.latest_signals.read().get(symbol).cloned()
    }

    /// Latest enriched series for one symbol.
    pub fn series(&self, symbol: &str) -> Option<Vec<EnrichedBar>> {
        self.latest_series.read().get(symbol).cloned()
    }

    /// Mark a refresh cycle as finished.
    pub fn finish_cycle(&self) {
        self.cycles_completed.fetch_add(1, Ordering::SeqCst);
        *self.last_cycle_at.write() = Some(Utc::now().to_rfc3339());
        self.increment_version();
    }

    // ── Snapshot builder ────────────────────────────────────────────────

    /// Build a complete, serialisable snapshot of the monitor state. This is
    /// the payload served by `GET /api/v1/state`.
    ///
    /// Only currently-configured symbols are included, so removing a symbol
    /// from the watch list also removes it from the dashboard.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let config = self.runtime_config.read();
        let signals = self.latest_signals.read();

        let mut included = HashMap::new();
        for symbol in &config.symbols {
            if let Some(result) = signals.get(symbol) {
                included.insert(symbol.clone(), result.clone());
            }
        }

        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: Utc::now().timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            cycles_completed: self.cycles_completed.load(Ordering::SeqCst),
            last_cycle_at: self.last_cycle_at.read().clone(),
            alerts_emitted: self.alerts.len(),
            config: RuntimeConfigSummary {
                symbols: config.symbols.clone(),
                interval: config.interval,
                refresh_secs: config.refresh_secs,
            },
            signals: included,
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

// =============================================================================
// Serialisable snapshot types
// =============================================================================

/// Full monitor state snapshot served to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<String>,
    /// Number of symbols that have emitted at least one alert this run.
    pub alerts_emitted: usize,
    pub config: RuntimeConfigSummary,
    pub signals: HashMap<String, SignalResult>,
    pub recent_errors: Vec<ErrorRecord>,
}

/// Summary of runtime config for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeConfigSummary {
    pub symbols: Vec<String>,
    pub interval: Interval,
    pub refresh_secs: u64,
}
