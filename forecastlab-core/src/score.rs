//! Forecast accuracy scoring.
//!
//! RMSE and MAE are always defined. MAPE divides by the actual value, so
//! it is only computed over entries with a non-zero actual; when every
//! actual is zero it is reported as an explicit `Undefined` sentinel —
//! never a divide-by-zero and never a silent `0`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::forecast::Forecast;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoreError {
    #[error("length mismatch: forecast has {forecast} entries, actuals have {actuals}")]
    LengthMismatch { forecast: usize, actuals: usize },

    #[error("cannot score an empty forecast")]
    EmptyForecast,
}

/// Mean absolute percentage error, or an explicit marker that it could
/// not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mape {
    Defined(f64),
    /// Every actual was zero; the ratio is undefined.
    Undefined,
}

impl Mape {
    pub fn value(&self) -> Option<f64> {
        match self {
            Mape::Defined(v) => Some(*v),
            Mape::Undefined => None,
        }
    }
}

/// Accuracy metrics for one forecast against held-out actuals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub rmse: f64,
    pub mae: f64,
    /// Percent (e.g. 4.2 means 4.2%), matching the stored-row convention.
    pub mape: Mape,
}

/// Score a forecast against held-out actuals of the same length.
pub fn score(forecast: &Forecast, actuals: &[f64]) -> Result<Metrics, ScoreError> {
    if forecast.len() != actuals.len() {
        return Err(ScoreError::LengthMismatch {
            forecast: forecast.len(),
            actuals: actuals.len(),
        });
    }
    // An empty pair would divide by zero and report NaN metrics.
    if forecast.is_empty() {
        return Err(ScoreError::EmptyForecast);
    }

    let n = actuals.len() as f64;
    let mut sq_sum = 0.0;
    let mut abs_sum = 0.0;
    let mut pct_sum = 0.0;
    let mut pct_count = 0usize;

    for (point, &actual) in forecast.points().iter().zip(actuals) {
        let err = actual - point.value;
        sq_sum += err * err;
        abs_sum += err.abs();
        if actual != 0.0 {
            pct_sum += (err / actual).abs();
            pct_count += 1;
        }
    }

    let mape = if pct_count == 0 {
        Mape::Undefined
    } else {
        Mape::Defined(pct_sum / pct_count as f64 * 100.0)
    };

    Ok(Metrics {
        rmse: (sq_sum / n).sqrt(),
        mae: abs_sum / n,
        mape,
    })
}
