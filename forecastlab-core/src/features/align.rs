//! Alignment of heterogeneous series onto a common cadence grid.
//!
//! Timestamps are snapped down to the governing cadence, then every series
//! is projected onto the union of snapped timestamps. A signal without a
//! value at a grid slot gets a gap (`None`) — imputation decides later
//! what survives.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDateTime, Timelike};

use crate::domain::{ObservationSeries, SignalId};

/// Series aligned to a shared timestamp grid, with gaps explicit.
#[derive(Debug, Clone)]
pub struct AlignedGrid {
    /// Union of snapped timestamps, ascending.
    pub index: Vec<NaiveDateTime>,
    /// One gap-carrying column per signal, each `index.len()` long.
    pub columns: BTreeMap<SignalId, Vec<Option<f64>>>,
}

/// Snap a timestamp down to a multiple of `cadence_hours` within the day.
fn snap(ts: NaiveDateTime, cadence_hours: u32) -> NaiveDateTime {
    let hour = ts.hour() - ts.hour() % cadence_hours;
    ts.date().and_hms_opt(hour, 0, 0).expect("valid snapped hour")
}

/// Align all series onto the union of their snapped timestamps.
///
/// When two observations snap to the same grid slot, the later one wins
/// (same rule as series construction).
pub fn align(
    series_by_signal: &BTreeMap<SignalId, ObservationSeries>,
    cadence_hours: u32,
) -> AlignedGrid {
    let mut slots: BTreeSet<NaiveDateTime> = BTreeSet::new();
    for series in series_by_signal.values() {
        for point in series.points() {
            slots.insert(snap(point.timestamp, cadence_hours));
        }
    }
    let index: Vec<NaiveDateTime> = slots.into_iter().collect();

    let mut columns = BTreeMap::new();
    for (signal, series) in series_by_signal {
        let mut lookup: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
        for point in series.points() {
            lookup.insert(snap(point.timestamp, cadence_hours), point.value);
        }
        let column: Vec<Option<f64>> = index.iter().map(|ts| lookup.get(ts).copied()).collect();
        columns.insert(signal.clone(), column);
    }

    AlignedGrid { index, columns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Observation;
    use chrono::NaiveDate;

    fn ts(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn series(points: &[(u32, f64)]) -> ObservationSeries {
        ObservationSeries::from_points(
            "test",
            points
                .iter()
                .map(|&(h, v)| Observation { timestamp: ts(h, 0), value: v })
                .collect(),
        )
    }

    #[test]
    fn union_of_timestamps_with_gaps() {
        let mut input = BTreeMap::new();
        input.insert(SignalId::from("a"), series(&[(0, 1.0), (2, 3.0)]));
        input.insert(SignalId::from("b"), series(&[(1, 10.0), (2, 20.0)]));
        let grid = align(&input, 1);

        assert_eq!(grid.index, vec![ts(0, 0), ts(1, 0), ts(2, 0)]);
        assert_eq!(
            grid.columns[&SignalId::from("a")],
            vec![Some(1.0), None, Some(3.0)]
        );
        assert_eq!(
            grid.columns[&SignalId::from("b")],
            vec![None, Some(10.0), Some(20.0)]
        );
    }

    #[test]
    fn sub_cadence_timestamps_snap_down() {
        let mut input = BTreeMap::new();
        input.insert(
            SignalId::from("a"),
            ObservationSeries::from_points(
                "test",
                vec![Observation { timestamp: ts(3, 45), value: 7.0 }],
            ),
        );
        let grid = align(&input, 1);
        assert_eq!(grid.index, vec![ts(3, 0)]);
        assert_eq!(grid.columns[&SignalId::from("a")], vec![Some(7.0)]);
    }

    #[test]
    fn empty_input_yields_empty_grid() {
        let mut input = BTreeMap::new();
        input.insert(SignalId::from("a"), ObservationSeries::empty("test"));
        let grid = align(&input, 1);
        assert!(grid.index.is_empty());
    }
}
