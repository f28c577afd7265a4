//! ForecastLab Core — domain types, data collection, feature building,
//! forecast strategies, and scoring.
//!
//! This crate contains the leaf components of the pipeline:
//! - Domain types (observation series, feature tables, forecasts, run records)
//! - Source adapters with the synthetic-fallback degradation contract
//! - Feature builder (alignment, bounded imputation, lag + calendar features)
//! - Forecast engine with a closed strategy set and a pluggable model seam
//! - Scorer (RMSE / MAE / MAPE with an explicit undefined-MAPE sentinel)
//! - Deterministic seed derivation for reproducible synthetic series
//!
//! Orchestration (the state machine that sequences these components) lives
//! in `forecastlab-runner`.

pub mod domain;
pub mod features;
pub mod forecast;
pub mod rng;
pub mod score;
pub mod sources;
