//! Pluggable forecast model seam.
//!
//! The `registered` strategy delegates to a model behind this capability
//! trait. Models are injected into a `ModelRegistry` by the embedding
//! application; the engine calls `fit` then `predict` and treats the model
//! as opaque.

use super::{Forecast, ForecastError};

/// Capability interface for an injected forecasting model.
pub trait ForecastModel: Send + Sync {
    fn name(&self) -> &str;

    /// Minimum history rows the model needs before `fit` is meaningful.
    fn min_history(&self) -> usize {
        1
    }

    /// Fit the model on the target history (oldest first).
    fn fit(&mut self, history: &[f64]) -> Result<(), ForecastError>;

    /// Predict `horizon` steps past the end of the fitted history.
    fn predict(&self, horizon: u32) -> Result<Forecast, ForecastError>;
}

/// Registry of injected models, keyed by strategy name.
#[derive(Default)]
pub struct ModelRegistry {
    models: Vec<Box<dyn ForecastModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: Box<dyn ForecastModel>) {
        self.models.push(model);
    }

    pub fn min_history(&self, name: &str) -> Option<usize> {
        self.models
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.min_history())
    }

    /// Fit-then-predict for a registered model.
    pub fn forecast(
        &mut self,
        name: &str,
        history: &[f64],
        horizon: u32,
    ) -> Result<Forecast, ForecastError> {
        let model = self
            .models
            .iter_mut()
            .find(|m| m.name() == name)
            .ok_or_else(|| ForecastError::UnknownModel(name.to_string()))?;
        model.fit(history)?;
        model.predict(horizon)
    }
}

/// Trailing-mean model: predicts the mean of the last `window` values.
///
/// The simplest useful `ForecastModel`; also serves as the reference
/// implementation for the registry seam in tests.
pub struct MovingAverageModel {
    window: usize,
    fitted_mean: Option<f64>,
}

impl MovingAverageModel {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            fitted_mean: None,
        }
    }
}

impl ForecastModel for MovingAverageModel {
    fn name(&self) -> &str {
        "moving_average"
    }

    fn min_history(&self) -> usize {
        self.window
    }

    fn fit(&mut self, history: &[f64]) -> Result<(), ForecastError> {
        if history.len() < self.window {
            return Err(ForecastError::InsufficientHistory {
                needed: self.window,
                have: history.len(),
            });
        }
        let tail = &history[history.len() - self.window..];
        self.fitted_mean = Some(tail.iter().sum::<f64>() / self.window as f64);
        Ok(())
    }

    fn predict(&self, horizon: u32) -> Result<Forecast, ForecastError> {
        let mean = self.fitted_mean.ok_or_else(|| ForecastError::Model {
            name: "moving_average".into(),
            reason: "predict called before fit".into(),
        })?;
        Ok(Forecast::from_values(vec![mean; horizon as usize]))
    }
}
