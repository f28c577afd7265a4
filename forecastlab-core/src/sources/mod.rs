//! Data collection: providers, the synthetic fallback, and the adapter
//! that enforces the degradation contract.

mod adapter;
mod openweather;
mod provider;
mod spot_price;
mod synthetic;

pub use adapter::{SourceAdapter, SourceOutcome};
pub use openweather::OpenWeatherProvider;
pub use provider::{Provider, ProviderPayload, SourceError};
pub use spot_price::SpotPriceProvider;
pub use synthetic::{SyntheticGenerator, SYNTHETIC_SOURCE_TAG};

use serde::{Deserialize, Serialize};

use crate::domain::SignalId;

/// Which provider implementation serves a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    SpotPrice,
    OpenWeather,
}

/// Declaration of one signal to collect: provider identity, the name of
/// the credential it needs, and the unit of its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSpec {
    pub id: SignalId,
    pub provider: ProviderKind,
    pub credential: String,
    pub units: String,
}
