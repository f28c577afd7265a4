//! Observation series: the raw material every pipeline run starts from.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Real,
    Synthetic,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Real => "real",
            Provenance::Synthetic => "synthetic",
        }
    }
}

/// Inclusive time range for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Range covering the `hours` hours ending at `end` (inclusive endpoints).
    pub fn trailing_hours(end: NaiveDateTime, hours: i64) -> Self {
        Self {
            start: end - Duration::hours(hours - 1),
            end,
        }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// One timestamped observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Ordered sequence of observations for one signal.
///
/// Timestamps are strictly increasing and unique; the constructor sorts
/// and dedupes (last value wins for a duplicate timestamp), so a malformed
/// provider payload cannot violate the invariant. An empty series is
/// valid — it degrades the run, it does not abort it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSeries {
    /// Tag identifying which collector produced the points.
    pub source: String,
    points: Vec<Observation>,
}

impl ObservationSeries {
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            points: Vec::new(),
        }
    }

    /// Build a series from unordered points: sort by timestamp, keep the
    /// last value for any duplicated timestamp.
    pub fn from_points(source: impl Into<String>, mut points: Vec<Observation>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by(|next, prev| {
            if next.timestamp == prev.timestamp {
                prev.value = next.value;
                true
            } else {
                false
            }
        });
        Self {
            source: source.into(),
            points,
        }
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.points.last()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Restrict the series to a time range (inclusive endpoints).
    pub fn clipped(&self, range: &TimeRange) -> Self {
        Self {
            source: self.source.clone(),
            points: self
                .points
                .iter()
                .copied()
                .filter(|p| range.contains(p.timestamp))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn from_points_sorts_and_dedupes_last_wins() {
        let series = ObservationSeries::from_points(
            "test",
            vec![
                Observation { timestamp: ts(2), value: 20.0 },
                Observation { timestamp: ts(0), value: 1.0 },
                Observation { timestamp: ts(2), value: 25.0 },
                Observation { timestamp: ts(1), value: 10.0 },
            ],
        );
        let values: Vec<f64> = series.points().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 10.0, 25.0]);
    }

    #[test]
    fn empty_series_is_valid() {
        let series = ObservationSeries::empty("test");
        assert!(series.is_empty());
        assert!(series.last().is_none());
    }

    #[test]
    fn clipped_keeps_inclusive_endpoints() {
        let series = ObservationSeries::from_points(
            "test",
            (0..5)
                .map(|h| Observation { timestamp: ts(h), value: h as f64 })
                .collect(),
        );
        let clipped = series.clipped(&TimeRange::new(ts(1), ts(3)));
        assert_eq!(clipped.len(), 3);
        assert_eq!(clipped.points()[0].timestamp, ts(1));
        assert_eq!(clipped.points()[2].timestamp, ts(3));
    }

    #[test]
    fn trailing_hours_covers_requested_span() {
        let range = TimeRange::trailing_hours(ts(23), 24);
        assert_eq!(range.start, ts(0));
        assert_eq!(range.end, ts(23));
    }
}
