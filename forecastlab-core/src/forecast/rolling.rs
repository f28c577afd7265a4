//! Rolling-window naive evaluation.
//!
//! Walks a series with a sliding window, issues a naive forecast at each
//! origin, and scores it against the values that actually followed. Used
//! for accuracy summaries over run history.

use crate::score::{score, Metrics};

use super::Forecast;

/// One rolling-window evaluation.
#[derive(Debug, Clone)]
pub struct RollingEval {
    /// Index of the forecast origin (last in-window observation).
    pub origin: usize,
    pub metrics: Metrics,
}

/// Evaluate naive forecasts over rolling windows of `values`.
///
/// A window of `window` observations ending at each origin produces a
/// `horizon`-step naive forecast scored against the next `horizon`
/// actuals; origins advance by `step`. Series too short for one full
/// window-plus-horizon yield an empty result.
pub fn rolling_eval(values: &[f64], horizon: usize, window: usize, step: usize) -> Vec<RollingEval> {
    if window == 0 || step == 0 || values.len() < window + horizon {
        return Vec::new();
    }

    let mut evals = Vec::new();
    let mut origin = window - 1;
    while origin + horizon < values.len() {
        let last = values[origin];
        let forecast = Forecast::from_values(vec![last; horizon]);
        let actuals = &values[origin + 1..origin + 1 + horizon];
        // Lengths match by construction.
        let metrics = score(&forecast, actuals).expect("rolling window lengths match");
        evals.push(RollingEval { origin, metrics });
        origin += step;
    }
    evals
}
