// =============================================================================
// Alert De-duplication State
// =============================================================================
//
// Process-wide map from symbol to the key of the last alert emitted for it.
// Created empty at startup and never cleared; growth is bounded in practice
// by the configured watch list.  Owned exclusively by the signal evaluator —
// nothing else reads or writes it.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Last-emitted alert key per symbol.
pub struct AlertState {
    last_alerts: RwLock<HashMap<String, String>>,
}

impl AlertState {
    pub fn new() -> Self {
        Self {
            last_alerts: RwLock::new(HashMap::new()),
        }
    }

    /// Atomically compare the stored key for `symbol` against `alert_key` and
    /// store the new key when they differ.
    ///
    /// Returns `true` when the key changed (the caller should notify). The
    /// read-check-write happens under a single write lock, so concurrent
    /// evaluations of the same symbol cannot both observe the stale key and
    /// double-notify.
    pub fn transition(&self, symbol: &str, alert_key: &str) -> bool {
        let mut map = self.last_alerts.write();
        match map.get(symbol) {
            Some(existing) if existing == alert_key => false,
            _ => {
                map.insert(symbol.to_string(), alert_key.to_string());
                true
            }
        }
    }

    /// The key of the last alert emitted for `symbol`, if any.
    pub fn last_key(&self, symbol: &str) -> Option<String> {
        self.last_alerts.read().get(symbol).cloned()
    }

    /// Number of symbols that have emitted at least one alert.
    pub fn len(&self) -> usize {
        self.last_alerts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_alerts.read().is_empty()
    }
}

impl Default for AlertState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_transition_stores_and_reports_change() {
        let state = AlertState::new();
        assert!(state.is_empty());
        assert!(state.transition("AAPL", "AAPL::golden cross"));
        assert_eq!(state.last_key("AAPL").as_deref(), Some("AAPL::golden cross"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn repeated_key_is_suppressed() {
        let state = AlertState::new();
        assert!(state.transition("AAPL", "AAPL::golden cross"));
        assert!(!state.transition("AAPL", "AAPL::golden cross"));
        assert!(!state.transition("AAPL", "AAPL::golden cross"));
    }

    #[test]
    fn changed_key_fires_again() {
        let state = AlertState::new();
        assert!(state.transition("AAPL", "AAPL::golden cross"));
        assert!(state.transition("AAPL", "AAPL::death cross"));
        assert_eq!(state.last_key("AAPL").as_deref(), Some("AAPL::death cross"));
    }

    #[test]
    fn symbols_are_independent() {
        let state = AlertState::new();
        assert!(state.transition("AAPL", "AAPL::golden cross"));
        assert!(state.transition("NVDA", "NVDA::golden cross"));
        assert!(!state.transition("AAPL", "AAPL::golden cross"));
        assert_eq!(state.len(), 2);
    }
}
