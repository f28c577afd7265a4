//! Source adapter: the degradation boundary for data collection.
//!
//! `fetch` never fails. A missing credential, unreachable provider,
//! non-2xx response, or malformed payload all narrow to a deterministic
//! synthetic series; the caller always receives observations plus the
//! provenance branch actually taken. Raw payloads from real fetches are
//! written to a staging area for reproducibility — a staging write
//! failure is logged and otherwise ignored.

use std::fs;
use std::path::PathBuf;

use crate::domain::{DiagEvent, ObservationSeries, Provenance, SignalId, TimeRange};

use super::provider::Provider;
use super::synthetic::SyntheticGenerator;

/// The two-branch result of one collection call.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Real(ObservationSeries),
    Synthetic {
        series: ObservationSeries,
        reason: String,
    },
}

impl SourceOutcome {
    pub fn series(&self) -> &ObservationSeries {
        match self {
            SourceOutcome::Real(series) => series,
            SourceOutcome::Synthetic { series, .. } => series,
        }
    }

    pub fn into_series(self) -> ObservationSeries {
        match self {
            SourceOutcome::Real(series) => series,
            SourceOutcome::Synthetic { series, .. } => series,
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            SourceOutcome::Real(_) => Provenance::Real,
            SourceOutcome::Synthetic { .. } => Provenance::Synthetic,
        }
    }
}

/// Adapter for one signal: a provider (when its credential resolved) plus
/// the synthetic fallback.
pub struct SourceAdapter {
    signal: SignalId,
    /// None when the signal's credential was absent at config time.
    provider: Option<Box<dyn Provider>>,
    generator: SyntheticGenerator,
    cadence_hours: u32,
    staging_dir: Option<PathBuf>,
}

impl SourceAdapter {
    pub fn new(
        signal: SignalId,
        provider: Option<Box<dyn Provider>>,
        generator: SyntheticGenerator,
        cadence_hours: u32,
    ) -> Self {
        Self {
            signal,
            provider,
            generator,
            cadence_hours,
            staging_dir: None,
        }
    }

    /// Enable staging of raw payloads under `dir`.
    pub fn with_staging(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn signal(&self) -> &SignalId {
        &self.signal
    }

    /// Collect observations for `range`. Infallible by contract; the
    /// diagnostic events describe any degradation that happened.
    pub fn fetch(&self, range: &TimeRange) -> (SourceOutcome, Vec<DiagEvent>) {
        let mut events = Vec::new();

        let provider = match &self.provider {
            Some(p) => p,
            None => {
                return (
                    self.degrade(range, "credential not configured", &mut events),
                    events,
                )
            }
        };

        match provider.fetch(range) {
            Ok(payload) => {
                if payload.series.is_empty() {
                    return (
                        self.degrade(range, "provider returned an empty series", &mut events),
                        events,
                    );
                }
                if let Err(reason) = self.stage(range, &payload.raw) {
                    events.push(DiagEvent::StagingSkipped {
                        signal: self.signal.clone(),
                        reason,
                    });
                }
                (SourceOutcome::Real(payload.series), events)
            }
            Err(err) => (self.degrade(range, &err.to_string(), &mut events), events),
        }
    }

    fn degrade(
        &self,
        range: &TimeRange,
        reason: &str,
        events: &mut Vec<DiagEvent>,
    ) -> SourceOutcome {
        events.push(DiagEvent::SourceDegraded {
            signal: self.signal.clone(),
            reason: reason.to_string(),
        });
        SourceOutcome::Synthetic {
            series: self
                .generator
                .generate(&self.signal, range, self.cadence_hours),
            reason: reason.to_string(),
        }
    }

    fn stage(&self, range: &TimeRange, raw: &str) -> Result<(), String> {
        let Some(dir) = &self.staging_dir else {
            return Ok(());
        };
        fs::create_dir_all(dir).map_err(|e| e.to_string())?;
        let file = dir.join(format!(
            "{}_{}.json",
            self.signal,
            range.end.format("%Y%m%d%H")
        ));
        fs::write(file, raw).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Observation;
    use crate::sources::provider::{ProviderPayload, SourceError};
    use chrono::NaiveDate;

    struct FixedProvider {
        result: fn(&TimeRange) -> Result<ProviderPayload, SourceError>,
    }

    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }
        fn fetch(&self, range: &TimeRange) -> Result<ProviderPayload, SourceError> {
            (self.result)(range)
        }
    }

    fn range() -> TimeRange {
        let end = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        TimeRange::trailing_hours(end, 48)
    }

    fn ok_payload(range: &TimeRange) -> Result<ProviderPayload, SourceError> {
        let series = ObservationSeries::from_points(
            "fixed",
            vec![Observation {
                timestamp: range.start,
                value: 50.0,
            }],
        );
        Ok(ProviderPayload {
            series,
            raw: "{}".to_string(),
        })
    }

    #[test]
    fn missing_credential_degrades_to_synthetic() {
        let adapter = SourceAdapter::new(
            SignalId::from("spot_price"),
            None,
            SyntheticGenerator::default(),
            1,
        );
        let (outcome, events) = adapter.fetch(&range());
        assert_eq!(outcome.provenance(), Provenance::Synthetic);
        assert!(!outcome.series().is_empty());
        assert!(matches!(events[0], DiagEvent::SourceDegraded { .. }));
    }

    #[test]
    fn provider_error_degrades_instead_of_propagating() {
        let adapter = SourceAdapter::new(
            SignalId::from("spot_price"),
            Some(Box::new(FixedProvider {
                result: |_| Err(SourceError::Http { status: 503 }),
            })),
            SyntheticGenerator::default(),
            1,
        );
        let (outcome, events) = adapter.fetch(&range());
        assert_eq!(outcome.provenance(), Provenance::Synthetic);
        assert!(events.iter().any(|e| matches!(
            e,
            DiagEvent::SourceDegraded { reason, .. } if reason.contains("503")
        )));
    }

    #[test]
    fn successful_fetch_is_real_with_no_events() {
        let adapter = SourceAdapter::new(
            SignalId::from("spot_price"),
            Some(Box::new(FixedProvider { result: ok_payload })),
            SyntheticGenerator::default(),
            1,
        );
        let (outcome, events) = adapter.fetch(&range());
        assert_eq!(outcome.provenance(), Provenance::Real);
        assert!(events.is_empty());
    }

    #[test]
    fn empty_provider_series_degrades() {
        let adapter = SourceAdapter::new(
            SignalId::from("spot_price"),
            Some(Box::new(FixedProvider {
                result: |_| {
                    Ok(ProviderPayload {
                        series: ObservationSeries::empty("fixed"),
                        raw: "{}".to_string(),
                    })
                },
            })),
            SyntheticGenerator::default(),
            1,
        );
        let (outcome, _) = adapter.fetch(&range());
        assert_eq!(outcome.provenance(), Provenance::Synthetic);
    }

    #[test]
    fn synthetic_fallback_is_deterministic_across_calls() {
        let adapter = SourceAdapter::new(
            SignalId::from("spot_price"),
            None,
            SyntheticGenerator::default(),
            1,
        );
        let (a, _) = adapter.fetch(&range());
        let (b, _) = adapter.fetch(&range());
        assert_eq!(a.series(), b.series());
    }

    #[test]
    fn staging_writes_raw_payload_for_real_fetches() {
        let tmp = tempfile::TempDir::new().unwrap();
        let adapter = SourceAdapter::new(
            SignalId::from("spot_price"),
            Some(Box::new(FixedProvider { result: ok_payload })),
            SyntheticGenerator::default(),
            1,
        )
        .with_staging(tmp.path());
        let (_, events) = adapter.fetch(&range());
        assert!(events.is_empty());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
