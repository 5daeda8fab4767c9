// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Span-parameterised recursive EMA:
//
//   alpha = 2 / (span + 1)
//   EMA_0 = close_0
//   EMA_t = close_t * alpha + EMA_{t-1} * (1 - alpha)
//
// The seed is the raw first observation with no bias adjustment, so the
// series is defined from the first bar onward.  Values are numerically
// unstable until roughly 1.5x the span has elapsed; the signal evaluator
// enforces its own warm-up guard on top of this.
// =============================================================================

/// Compute the EMA series for `values` with the given `span`.
///
/// Output has the same length as the input. Returns an empty `Vec` when the
/// input is empty or the span is zero.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || values.is_empty() {
        return Vec::new();
    }

    let alpha = 2.0 / (span as f64 + 1.0);

    let mut result = Vec::with_capacity(values.len());
    let mut prev = values[0];
    result.push(prev);

    for &value in &values[1..] {
        let ema = value * alpha + prev * (1.0 - alpha);
        result.push(ema);
        prev = ema;
    }

    result
}
