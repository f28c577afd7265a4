//! Feature builder: align → impute → derive → drop incomplete rows.
//!
//! Each step tolerates partial input. Alignment leaves gaps explicit,
//! imputation fills only bounded runs, and any row still missing a
//! required column at the end is dropped (counted, not silent). The
//! resulting `FeatureTable` satisfies the identical-key-set invariant by
//! construction.

mod align;
mod derive;
mod impute;
mod table;

pub use align::{align, AlignedGrid};
pub use derive::{calendar_columns, lag_column};
pub use impute::{forward_fill_bounded, UnfilledSpan};
pub use table::FeatureTable;

use std::collections::BTreeMap;

use crate::domain::{DiagEvent, ObservationSeries, SignalId};

/// Options governing feature construction for one run.
#[derive(Debug, Clone)]
pub struct FeatureOptions {
    /// Governing cadence of the grid, in hours.
    pub cadence_hours: u32,
    /// Lags (in grid steps) derived for the target signal.
    pub lag_set: Vec<u32>,
    /// Longest gap (consecutive slots) forward-fill may bridge.
    pub max_ffill_run: usize,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            cadence_hours: 1,
            lag_set: vec![1, 24],
            max_ffill_run: 3,
        }
    }
}

/// Build the feature table for one run.
///
/// Returns the table plus the diagnostic events produced along the way
/// (imputation gaps, dropped-row count).
pub fn build(
    series_by_signal: &BTreeMap<SignalId, ObservationSeries>,
    target: &SignalId,
    opts: &FeatureOptions,
) -> (FeatureTable, Vec<DiagEvent>) {
    let mut events = Vec::new();

    // 1. Align onto the union grid at the governing cadence.
    let grid = align(series_by_signal, opts.cadence_hours);
    if grid.index.is_empty() {
        return (FeatureTable::empty(), events);
    }

    // 2. Bounded forward-fill per signal; unfillable spans are recorded
    //    and left open for the row-drop pass.
    let mut columns: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for (signal, mut column) in grid.columns.clone() {
        for span in forward_fill_bounded(&mut column, opts.max_ffill_run) {
            events.push(DiagEvent::ImputationGap {
                signal: signal.clone(),
                span_start: grid.index[span.start],
                len: span.len,
            });
        }
        columns.insert(signal.as_str().to_string(), column);
    }

    // 3a. Lag features for the target signal.
    if let Some(target_col) = columns.get(target.as_str()).cloned() {
        for &lag in &opts.lag_set {
            columns.insert(
                format!("{target}_lag_{lag}"),
                lag_column(&target_col, lag as usize),
            );
        }
    }

    // 3b. Calendar features from the index (never gapped).
    let calendar: Vec<(String, Vec<Option<f64>>)> = calendar_columns(&grid.index)
        .into_iter()
        .map(|(name, values)| (name.to_string(), values.into_iter().map(Some).collect()))
        .collect();
    for (name, column) in calendar {
        columns.insert(name, column);
    }

    // 4. Drop rows that still miss any column.
    let keep: Vec<usize> = (0..grid.index.len())
        .filter(|&i| columns.values().all(|col| col[i].is_some()))
        .collect();
    let dropped = grid.index.len() - keep.len();
    if dropped > 0 {
        events.push(DiagEvent::RowsDropped { count: dropped });
    }

    let index: Vec<_> = keep.iter().map(|&i| grid.index[i]).collect();
    let dense: BTreeMap<String, Vec<f64>> = columns
        .into_iter()
        .map(|(name, col)| {
            let values = keep.iter().map(|&i| col[i].expect("kept row is complete")).collect();
            (name, values)
        })
        .collect();

    (FeatureTable::from_columns(index, dense), events)
}
