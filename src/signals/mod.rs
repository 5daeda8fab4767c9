// =============================================================================
// Signals Module
// =============================================================================
//
// Signal pipeline for the monitor:
// - Stateful crossover/breakout classification over an enriched series
// - Alert de-duplication keyed on (symbol, final message)

pub mod alert_state;
pub mod evaluator;

pub use alert_state::AlertState;
pub use evaluator::{evaluate, MIN_BARS};
