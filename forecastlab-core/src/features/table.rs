//! Dense feature table.
//!
//! Column-major storage over a shared timestamp index. The "identical key
//! set per row" invariant is structural: a row is one slot in every column
//! vector, so a partial row is unrepresentable.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Feature matrix with a shared, sorted timestamp index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    index: Vec<NaiveDateTime>,
    /// Column names, sorted; stable for the lifetime of one run.
    columns: Vec<String>,
    /// One vector per column, each the same length as `index`.
    data: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Assemble a table from complete columns keyed by name.
    ///
    /// Every column must have the same length as the index; the BTreeMap
    /// fixes the column order deterministically.
    pub fn from_columns(
        index: Vec<NaiveDateTime>,
        columns: BTreeMap<String, Vec<f64>>,
    ) -> Self {
        let (names, data): (Vec<String>, Vec<Vec<f64>>) = columns.into_iter().unzip();
        for col in &data {
            assert_eq!(col.len(), index.len(), "column length must match index");
        }
        Self {
            index,
            columns: names,
            data,
        }
    }

    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            columns: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let pos = self.columns.iter().position(|c| c == name)?;
        Some(&self.data[pos])
    }

    /// One row as (name, value) pairs, in column order.
    pub fn row(&self, i: usize) -> Vec<(&str, f64)> {
        self.columns
            .iter()
            .zip(&self.data)
            .map(|(name, col)| (name.as_str(), col[i]))
            .collect()
    }

    /// Trailing `n` values of one column, if present and long enough.
    pub fn column_tail(&self, name: &str, n: usize) -> Option<&[f64]> {
        let col = self.column(name)?;
        if col.len() < n {
            return None;
        }
        Some(&col[col.len() - n..])
    }
}
