//! Forecast engine: closed strategy set over a feature table.
//!
//! Strategies:
//! - `naive` — persistence: every step repeats the last observed value.
//! - `seasonal_naive` — step *h* repeats the value one season period
//!   earlier, wrapping within the last season and falling back to naive
//!   for steps whose seasonal offset precedes the available history.
//! - `registered` — delegates to an injected model behind the
//!   `ForecastModel` capability trait; the engine knows nothing about its
//!   internals.
//!
//! `InsufficientHistory` is the one non-degradable error here: it is
//! reported to the orchestrator, never silently defaulted.

mod model;
mod rolling;

pub use model::{ForecastModel, ModelRegistry, MovingAverageModel};
pub use rolling::{rolling_eval, RollingEval};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::FeatureTable;

#[derive(Debug, Error, PartialEq)]
pub enum ForecastError {
    #[error("insufficient history: strategy needs {needed} rows, have {have}")]
    InsufficientHistory { needed: usize, have: usize },

    #[error("target column '{0}' not present in feature table")]
    MissingTarget(String),

    #[error("no model registered under '{0}'")]
    UnknownModel(String),

    #[error("model '{name}' failed: {reason}")]
    Model { name: String, reason: String },
}

/// One forecast step: 1-based offset from the forecast origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub step: u32,
    pub value: f64,
}

/// Point forecast over a fixed horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    points: Vec<ForecastPoint>,
}

impl Forecast {
    /// Build from per-step values; steps are numbered from 1.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            points: values
                .into_iter()
                .enumerate()
                .map(|(i, value)| ForecastPoint {
                    step: i as u32 + 1,
                    value,
                })
                .collect(),
        }
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Forecast strategy, selected by name in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    Naive,
    SeasonalNaive { period: usize },
    Registered { name: String },
}

impl Strategy {
    pub fn name(&self) -> &str {
        match self {
            Strategy::Naive => "naive",
            Strategy::SeasonalNaive { .. } => "seasonal_naive",
            Strategy::Registered { name } => name,
        }
    }

    /// Minimum history rows the strategy needs. Seasonal-naive wraps to
    /// naive per step, so its floor is the same as naive's.
    fn min_history(&self, registry: &ModelRegistry) -> usize {
        match self {
            Strategy::Naive | Strategy::SeasonalNaive { .. } => 1,
            Strategy::Registered { name } => {
                registry.min_history(name).unwrap_or(1)
            }
        }
    }
}

/// Produce a point forecast for `horizon` steps of the target column.
pub fn forecast(
    table: &FeatureTable,
    target: &str,
    horizon: u32,
    strategy: &Strategy,
    registry: &mut ModelRegistry,
) -> Result<Forecast, ForecastError> {
    let history = table
        .column(target)
        .ok_or_else(|| ForecastError::MissingTarget(target.to_string()))?;

    let needed = strategy.min_history(registry);
    if history.len() < needed {
        return Err(ForecastError::InsufficientHistory {
            needed,
            have: history.len(),
        });
    }

    match strategy {
        Strategy::Naive => Ok(naive(history, horizon)),
        Strategy::SeasonalNaive { period } => Ok(seasonal_naive(history, horizon, *period)),
        Strategy::Registered { name } => registry.forecast(name, history, horizon),
    }
}

/// Persistence forecast: repeat the last observed value.
fn naive(history: &[f64], horizon: u32) -> Forecast {
    let last = *history.last().expect("history checked non-empty");
    Forecast::from_values(vec![last; horizon as usize])
}

/// Seasonal persistence: step *h* takes the value one season period back,
/// wrapping within the final season for steps past the first period.
/// Steps whose seasonal offset precedes the history fall back to naive.
fn seasonal_naive(history: &[f64], horizon: u32, period: usize) -> Forecast {
    let n = history.len();
    let last = *history.last().expect("history checked non-empty");
    let values = (1..=horizon as usize)
        .map(|h| {
            if period == 0 || n < period {
                return last;
            }
            let offset = (h - 1) % period;
            history[n - period + offset]
        })
        .collect();
    Forecast::from_values(values)
}
