//! Derived features: lags of the target signal and calendar features
//! from the timestamp index.

use chrono::{Datelike, NaiveDateTime, Timelike};

/// Lag column for the target: value at `i` is `target[i - lag]`.
///
/// The first `lag` slots have no history and stay gaps; the row-drop pass
/// removes them, which is what trims the warmup rows off the table.
pub fn lag_column(target: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    (0..target.len())
        .map(|i| {
            if i < lag {
                None
            } else {
                target[i - lag]
            }
        })
        .collect()
}

/// Calendar features derived from the timestamp index. Always complete.
///
/// Columns: hour-of-day, day-of-week (Monday = 0), month, is_weekend.
pub fn calendar_columns(index: &[NaiveDateTime]) -> Vec<(&'static str, Vec<f64>)> {
    let hour = index.iter().map(|ts| ts.hour() as f64).collect();
    let weekday = index
        .iter()
        .map(|ts| ts.weekday().num_days_from_monday() as f64)
        .collect();
    let month = index.iter().map(|ts| ts.month() as f64).collect();
    let is_weekend = index
        .iter()
        .map(|ts| {
            if ts.weekday().num_days_from_monday() >= 5 {
                1.0
            } else {
                0.0
            }
        })
        .collect();

    vec![
        ("hour", hour),
        ("weekday", weekday),
        ("month", month),
        ("is_weekend", is_weekend),
    ]
}
