// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Middle band = rolling SMA over the window, upper/lower = middle ± k·σ where
// σ is the rolling *sample* standard deviation (n − 1 divisor) of the same
// window.  The first `window − 1` positions are undefined and reported as
// `None` rather than a partial-window estimate.

/// Per-bar Bollinger columns for a close series. All three vectors have the
/// same length as the input.
#[derive(Debug, Clone)]
pub struct BollingerColumns {
    pub middle: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Rolling mean over a trailing `window`. `None` until a full window exists.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            Some(slice.iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Rolling sample standard deviation (n − 1 divisor) over a trailing
/// `window`. `None` until a full window exists; a window of fewer than two
/// observations has no sample deviation and yields all `None`.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }

    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let sum_sq: f64 = slice.iter().map(|x| (x - mean).powi(2)).sum();
            Some((sum_sq / (window as f64 - 1.0)).sqrt())
        })
        .collect()
}

/// Compute the full Bollinger column set for `closes`.
pub fn bollinger_columns(closes: &[f64], window: usize, num_std: f64) -> BollingerColumns {
    let middle = rolling_mean(closes, window);
    let std = rolling_std(closes, window);

    let upper = middle
        .iter()
        .zip(std.iter())
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m + num_std * s),
            _ => None,
        })
        .collect();

    let lower = middle
        .iter()
        .zip(std.iter())
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m - num_std * s),
            _ => None,
        })
        .collect();

    BollingerColumns { middle, upper, lower }
}
