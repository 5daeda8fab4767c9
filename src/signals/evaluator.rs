// =============================================================================
// Signal Evaluator — crossover/breakout classification + alert dispatch
// =============================================================================
//
// Classification reads exactly the last two bars of an enriched series and
// runs a fixed override chain:
//
//   1. EMA crossover (fast 9 vs slow 21) — the only rule that can trigger a
//      notification.
//   2. Bollinger breakout — overrides the displayed message and severity but
//      never the trigger flag.
//
// The asymmetry is deliberate: a band touch changes what the dashboard shows,
// a crossover changes what gets pushed. The de-duplication key is built from
// the FINAL message after the override, so a breakout that lands on the same
// bar as a crossover dedups under the breakout text.

use chrono::Utc;
use tracing::{info, warn};

use crate::indicators::enrich::EnrichedBar;
use crate::notify::Notify;
use crate::signals::alert_state::AlertState;
use crate::types::{BandPosition, MacdStatus, Severity, SignalResult, TrendDirection};

/// Minimum series length before any classification is attempted. Below this
/// the MACD and trend EMAs have not warmed up and crossover timing is noise.
pub const MIN_BARS: usize = 35;

/// Trailing window for the volume ratio quoted in alerts.
const VOLUME_WINDOW: usize = 10;

const MSG_TREND_STABLE: &str = "trend stable";
const MSG_STRONG_BUY: &str = "strong buy (EMA+MACD)";
const MSG_GOLDEN_CROSS: &str = "golden cross";
const MSG_DEATH_CROSS: &str = "death cross";
const MSG_UPPER_BAND: &str = "touching upper band (overbought)";
const MSG_LOWER_BAND: &str = "touching lower band (oversold)";

/// Outcome of the override chain for one bar pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Classification {
    message: &'static str,
    severity: Severity,
    triggered: bool,
}

/// Run the override chain against the previous and last bars.
fn classify(prev: &EnrichedBar, last: &EnrichedBar) -> Classification {
    let mut message = MSG_TREND_STABLE;
    let mut severity = Severity::Info;
    let mut triggered = false;

    // 1. EMA crossover. The `<=` / `>=` on the previous bar is intentional:
    //    a flat-to-above transition counts as a cross.
    if prev.ema_fast <= prev.ema_slow && last.ema_fast > last.ema_slow {
        if last.macd_hist > 0.0 {
            message = MSG_STRONG_BUY;
            severity = Severity::Critical;
        } else {
            message = MSG_GOLDEN_CROSS;
            severity = Severity::Warning;
        }
        triggered = true;
    } else if prev.ema_fast >= prev.ema_slow && last.ema_fast < last.ema_slow {
        message = MSG_DEATH_CROSS;
        severity = Severity::Critical;
        triggered = true;
    }

    // 2. Bollinger breakout overrides message/severity, never `triggered`.
    if let (Some(upper), Some(lower)) = (last.bb_upper, last.bb_lower) {
        if last.bar.close > upper {
            message = MSG_UPPER_BAND;
            severity = Severity::Warning;
        } else if last.bar.close < lower {
            message = MSG_LOWER_BAND;
            severity = Severity::Warning;
        }
    }

    Classification {
        message,
        severity,
        triggered,
    }
}

/// Ratio of the last bar's volume to the mean volume of the trailing
/// [`VOLUME_WINDOW`] bars (last bar included). Clamped to 0.0 when the mean
/// is zero or the ratio is otherwise non-finite.
fn volume_ratio(enriched: &[EnrichedBar]) -> f64 {
    let last = match enriched.last() {
        Some(bar) => bar,
        None => return 0.0,
    };

    let start = enriched.len().saturating_sub(VOLUME_WINDOW);
    let tail = &enriched[start..];
    let mean = tail.iter().map(|e| e.bar.volume).sum::<f64>() / tail.len() as f64;

    let ratio = last.bar.volume / mean;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Build the human-readable alert payload.
fn alert_text(symbol: &str, message: &str, enriched: &[EnrichedBar]) -> String {
    let last = &enriched[enriched.len() - 1];
    let macd_label = if last.macd_hist > 0.0 {
        "bulls in control"
    } else {
        "bears in control"
    };

    format!(
        "*{symbol}* — {message}\nprice: {:.2}\nMACD: {macd_label}\nvolume: {:.1}x vs {VOLUME_WINDOW}-bar average",
        last.bar.close,
        volume_ratio(enriched),
    )
}

/// Evaluate one symbol's enriched series.
///
/// Returns `None` when the series is shorter than [`MIN_BARS`] — the caller
/// treats that the same as "no data this cycle". Otherwise classifies the
/// last bar pair, and when a crossover trigger produces an alert key the
/// symbol has not emitted before, pushes a notification through `notifier`.
///
/// Delivery is fire-and-forget: a failed send is logged and swallowed, and
/// the de-duplication state advances regardless, so a flapping notifier does
/// not re-alert on every cycle.
pub async fn evaluate(
    enriched: &[EnrichedBar],
    symbol: &str,
    alerts: &AlertState,
    notifier: &dyn Notify,
) -> Option<SignalResult> {
    if enriched.len() < MIN_BARS {
        return None;
    }

    let last = &enriched[enriched.len() - 1];
    let prev = &enriched[enriched.len() - 2];

    // At MIN_BARS the Bollinger window is always populated; a gap here means
    // the input did not come from `enrich` and is not classifiable.
    let (bb_upper, bb_lower) = match (last.bb_upper, last.bb_lower) {
        (Some(upper), Some(lower)) => (upper, lower),
        _ => return None,
    };

    let classification = classify(prev, last);
    let price = last.bar.close;

    if classification.triggered {
        let alert_key = format!("{}::{}", symbol, classification.message);
        if alerts.transition(symbol, &alert_key) {
            let text = alert_text(symbol, classification.message, enriched);
            match notifier.send(&text).await {
                Ok(()) => {
                    info!(symbol, message = classification.message, "alert sent");
                }
                Err(e) => {
                    warn!(symbol, error = %e, "alert delivery failed; state advanced anyway");
                }
            }
        }
    }

    Some(SignalResult {
        symbol: symbol.to_string(),
        price,
        bb_position: if bb_lower < price && price < bb_upper {
            BandPosition::Inside
        } else {
            BandPosition::Outside
        },
        macd_status: if last.macd_hist > 0.0 {
            MacdStatus::Bullish
        } else {
            MacdStatus::Bearish
        },
        trend: if last.ema_fast > last.ema_slow {
            TrendDirection::Bullish
        } else {
            TrendDirection::Bearish
        },
        message: classification.message.to_string(),
        severity: classification.severity,
        evaluated_at: Utc::now().to_rfc3339(),
    })
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::enrich::enrich;
    use crate::market_data::PriceBar;
    use anyhow::Result;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    // ---- test doubles ------------------------------------------------------

    /// Records every payload; optionally fails each send.
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn count(&self) -> usize {
            self.sent.lock().len()
        }
    }

    #[async_trait]
    impl Notify for RecordingNotifier {
        async fn send(&self, text: &str) -> Result<()> {
            self.sent.lock().push(text.to_string());
            if self.fail {
                anyhow::bail!("simulated delivery failure");
            }
            Ok(())
        }
    }

    // ---- fixture builders --------------------------------------------------

    fn bar(close: f64, volume: f64) -> PriceBar {
        PriceBar {
            timestamp: 0,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    /// A hand-built enriched bar for direct classification fixtures.
    fn ebar(
        close: f64,
        ema_fast: f64,
        ema_slow: f64,
        macd_hist: f64,
        bb_upper: f64,
        bb_lower: f64,
    ) -> EnrichedBar {
        EnrichedBar {
            bar: bar(close, 1_000.0),
            bb_mid: Some((bb_upper + bb_lower) / 2.0),
            bb_upper: Some(bb_upper),
            bb_lower: Some(bb_lower),
            macd: macd_hist,
            macd_signal: 0.0,
            macd_hist,
            ema_fast,
            ema_slow,
        }
    }

    /// Pad to MIN_BARS with neutral copies of `prev`, then append prev + last.
    fn series(prev: EnrichedBar, last: EnrichedBar) -> Vec<EnrichedBar> {
        let mut out = vec![prev.clone(); MIN_BARS - 1];
        out.push(prev);
        out.push(last);
        out
    }

    // ---- warm-up guard -----------------------------------------------------

    #[tokio::test]
    async fn short_series_yields_no_result() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 10.0, 11.0, 0.5, 105.0, 95.0);
        let last = ebar(100.0, 12.0, 11.0, 0.5, 105.0, 95.0);
        let mut bars = series(prev, last);
        bars.truncate(MIN_BARS - 1);

        let result = evaluate(&bars, "AAPL", &alerts, &notifier).await;
        assert!(result.is_none());
        assert_eq!(notifier.count(), 0);
        assert!(alerts.is_empty());
    }

    // ---- crossover scenarios -----------------------------------------------

    #[tokio::test]
    async fn bullish_cross_with_positive_histogram_is_strong_buy() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 10.0, 11.0, 0.5, 105.0, 95.0);
        let last = ebar(100.0, 12.0, 11.0, 0.5, 105.0, 95.0);

        let result = evaluate(&series(prev, last), "AAPL", &alerts, &notifier)
            .await
            .unwrap();

        assert_eq!(result.message, "strong buy (EMA+MACD)");
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(notifier.count(), 1);
        assert_eq!(
            alerts.last_key("AAPL").as_deref(),
            Some("AAPL::strong buy (EMA+MACD)")
        );
    }

    #[tokio::test]
    async fn bullish_cross_with_negative_histogram_is_golden_cross() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 10.0, 11.0, -0.3, 105.0, 95.0);
        let last = ebar(100.0, 12.0, 11.0, -0.3, 105.0, 95.0);

        let result = evaluate(&series(prev, last), "AAPL", &alerts, &notifier)
            .await
            .unwrap();

        assert_eq!(result.message, "golden cross");
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn bearish_cross_is_death_cross() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 11.0, 10.0, 0.1, 105.0, 95.0);
        let last = ebar(100.0, 9.0, 10.0, 0.1, 105.0, 95.0);

        let result = evaluate(&series(prev, last), "TSLA", &alerts, &notifier)
            .await
            .unwrap();

        assert_eq!(result.message, "death cross");
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(notifier.count(), 1);
        assert_eq!(alerts.last_key("TSLA").as_deref(), Some("TSLA::death cross"));
    }

    #[tokio::test]
    async fn no_cross_is_trend_stable_and_silent() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 12.0, 11.0, 0.5, 105.0, 95.0);
        let last = ebar(100.0, 12.5, 11.0, 0.5, 105.0, 95.0);

        let result = evaluate(&series(prev, last), "AAPL", &alerts, &notifier)
            .await
            .unwrap();

        assert_eq!(result.message, "trend stable");
        assert_eq!(result.severity, Severity::Info);
        assert_eq!(notifier.count(), 0);
        assert!(alerts.is_empty());
    }

    // ---- Bollinger override ------------------------------------------------

    #[tokio::test]
    async fn breakout_without_cross_displays_but_never_notifies() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 12.0, 11.0, 0.5, 100.0, 90.0);
        let last = ebar(105.0, 12.0, 11.0, 0.5, 100.0, 90.0);

        let result = evaluate(&series(prev, last), "NVDA", &alerts, &notifier)
            .await
            .unwrap();

        assert_eq!(result.message, "touching upper band (overbought)");
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(notifier.count(), 0);
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn lower_band_breakout_is_oversold() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 12.0, 11.0, -0.5, 110.0, 96.0);
        let last = ebar(95.0, 12.0, 11.0, -0.5, 110.0, 96.0);

        let result = evaluate(&series(prev, last), "NVDA", &alerts, &notifier)
            .await
            .unwrap();

        assert_eq!(result.message, "touching lower band (oversold)");
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn breakout_override_keeps_trigger_and_uses_final_key() {
        // Bullish cross and upper-band breakout on the same bar: the breakout
        // wins the display, the crossover still notifies, and the dedup key
        // is built from the final (breakout) message.
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 10.0, 11.0, 0.5, 100.0, 90.0);
        let last = ebar(105.0, 12.0, 11.0, 0.5, 100.0, 90.0);

        let result = evaluate(&series(prev, last), "AAPL", &alerts, &notifier)
            .await
            .unwrap();

        assert_eq!(result.message, "touching upper band (overbought)");
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(notifier.count(), 1);
        assert_eq!(
            alerts.last_key("AAPL").as_deref(),
            Some("AAPL::touching upper band (overbought)")
        );
    }

    // ---- de-duplication ----------------------------------------------------

    #[tokio::test]
    async fn repeated_evaluation_notifies_at_most_once() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 10.0, 11.0, 0.5, 105.0, 95.0);
        let last = ebar(100.0, 12.0, 11.0, 0.5, 105.0, 95.0);
        let bars = series(prev, last);

        let first = evaluate(&bars, "AAPL", &alerts, &notifier).await.unwrap();
        let second = evaluate(&bars, "AAPL", &alerts, &notifier).await.unwrap();

        assert_eq!(first.message, second.message);
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn changed_message_notifies_again() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();

        let golden = series(
            ebar(100.0, 10.0, 11.0, -0.3, 105.0, 95.0),
            ebar(100.0, 12.0, 11.0, -0.3, 105.0, 95.0),
        );
        evaluate(&golden, "AAPL", &alerts, &notifier).await.unwrap();

        let death = series(
            ebar(100.0, 11.0, 10.0, 0.1, 105.0, 95.0),
            ebar(100.0, 9.0, 10.0, 0.1, 105.0, 95.0),
        );
        evaluate(&death, "AAPL", &alerts, &notifier).await.unwrap();

        assert_eq!(notifier.count(), 2);
        assert_eq!(alerts.last_key("AAPL").as_deref(), Some("AAPL::death cross"));
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed_and_state_advances() {
        let notifier = RecordingNotifier::failing();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 10.0, 11.0, 0.5, 105.0, 95.0);
        let last = ebar(100.0, 12.0, 11.0, 0.5, 105.0, 95.0);
        let bars = series(prev, last);

        let result = evaluate(&bars, "AAPL", &alerts, &notifier).await;
        assert!(result.is_some());
        assert_eq!(
            alerts.last_key("AAPL").as_deref(),
            Some("AAPL::strong buy (EMA+MACD)")
        );

        // The key is already stored, so the next cycle does not retry.
        evaluate(&bars, "AAPL", &alerts, &notifier).await.unwrap();
        assert_eq!(notifier.count(), 1);
    }

    // ---- display-only fields -----------------------------------------------

    #[tokio::test]
    async fn display_fields_follow_the_last_bar() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 9.0, 11.0, -0.5, 110.0, 96.0);
        let last = ebar(95.0, 9.0, 11.0, -0.5, 110.0, 96.0);

        let result = evaluate(&series(prev, last), "NVDA", &alerts, &notifier)
            .await
            .unwrap();

        assert!((result.price - 95.0).abs() < f64::EPSILON);
        assert_eq!(result.bb_position, BandPosition::Outside);
        assert_eq!(result.macd_status, MacdStatus::Bearish);
        assert_eq!(result.trend, TrendDirection::Bearish);
    }

    // ---- alert payload -----------------------------------------------------

    #[tokio::test]
    async fn alert_payload_contains_symbol_price_and_volume_ratio() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();
        let prev = ebar(100.0, 10.0, 11.0, 0.5, 105.0, 95.0);
        let mut last = ebar(102.5, 12.0, 11.0, 0.5, 105.0, 95.0);
        // Last bar at twice the filler volume: trailing-10 mean is
        // (9*1000 + 2000) / 10 = 1100, so the ratio is 2000/1100 ≈ 1.8x.
        last.bar.volume = 2_000.0;

        evaluate(&series(prev, last), "AAPL", &alerts, &notifier)
            .await
            .unwrap();

        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("AAPL"));
        assert!(sent[0].contains("strong buy (EMA+MACD)"));
        assert!(sent[0].contains("102.50"));
        assert!(sent[0].contains("bulls in control"));
        assert!(sent[0].contains("1.8x"));
    }

    #[test]
    fn volume_ratio_clamps_zero_mean() {
        let mut bars = vec![ebar(100.0, 1.0, 1.0, 0.0, 105.0, 95.0); 12];
        for b in bars.iter_mut() {
            b.bar.volume = 0.0;
        }
        assert_eq!(volume_ratio(&bars), 0.0);
        assert_eq!(volume_ratio(&[]), 0.0);
    }

    // ---- end-to-end through the indicator engine ---------------------------

    #[tokio::test]
    async fn flat_series_never_triggers() {
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();

        let bars: Vec<PriceBar> = (0..40).map(|_| bar(100.0, 1_000.0)).collect();
        let enriched = enrich(&bars);
        let result = evaluate(&enriched, "AAPL", &alerts, &notifier)
            .await
            .unwrap();

        assert_eq!(result.message, "trend stable");
        assert_eq!(result.severity, Severity::Info);
        assert_eq!(notifier.count(), 0);
        // Degenerate bands: close == upper == lower, which is not strictly
        // inside the channel.
        assert_eq!(result.bb_position, BandPosition::Outside);
    }

    #[tokio::test]
    async fn breakout_on_the_cross_bar_dedups_under_the_breakout_text() {
        // 40 flat bars, then one sharp up-bar: the fast EMA crosses above the
        // slow EMA on the same bar that pierces the (very tight) upper band.
        let notifier = RecordingNotifier::new();
        let alerts = AlertState::new();

        let mut bars: Vec<PriceBar> = (0..40).map(|_| bar(100.0, 1_000.0)).collect();
        bars.push(bar(101.0, 1_500.0));
        let enriched = enrich(&bars);

        let last = enriched.last().unwrap();
        let prev = &enriched[enriched.len() - 2];
        assert!(prev.ema_fast <= prev.ema_slow && last.ema_fast > last.ema_slow);
        assert!(last.bar.close > last.bb_upper.unwrap());

        let result = evaluate(&enriched, "BTC-USD", &alerts, &notifier)
            .await
            .unwrap();

        assert_eq!(result.message, "touching upper band (overbought)");
        assert_eq!(notifier.count(), 1);
        assert_eq!(
            alerts.last_key("BTC-USD").as_deref(),
            Some("BTC-USD::touching upper band (overbought)")
        );
    }
}
