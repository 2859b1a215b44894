//! Per-column min-max scaling.
//!
//! Statistics come from each column's observed entries only and are never
//! shared across columns. Missing cells pass through untouched.

use crate::error::{ImputationError, Result};
use crate::matrix::DataMatrix;
use serde::{Deserialize, Serialize};

/// Observed span of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Min-max scaler fitted once per matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxNormalizer {
    /// `None` for columns without any observed value
    ranges: Vec<Option<ColumnRange>>,
}

impl MinMaxNormalizer {
    /// Compute min and max of every column over its non-missing entries.
    pub fn fit(matrix: &DataMatrix) -> Self {
        let ranges = (0..matrix.n_cols())
            .map(|c| {
                matrix
                    .rows()
                    .iter()
                    .filter_map(|row| row[c])
                    .fold(None, |range: Option<ColumnRange>, v| {
                        Some(match range {
                            None => ColumnRange { min: v, max: v },
                            Some(r) => ColumnRange {
                                min: r.min.min(v),
                                max: r.max.max(v),
                            },
                        })
                    })
            })
            .collect();
        Self { ranges }
    }

    /// Range of a column, if it has observed values.
    pub fn range(&self, column: usize) -> Option<ColumnRange> {
        self.ranges.get(column).copied().flatten()
    }

    /// Scale a value of `column` into [0, 1]. Constant columns map to 0.
    pub fn normalize_value(&self, column: usize, value: f64) -> f64 {
        match self.range(column) {
            Some(range) if range.span() > 0.0 => (value - range.min) / range.span(),
            _ => 0.0,
        }
    }

    /// Map a normalized value of `column` back to its original units.
    pub fn denormalize_value(&self, column: usize, value: f64) -> f64 {
        match self.range(column) {
            Some(range) => range.min + value * range.span(),
            None => value,
        }
    }

    /// Normalized copy of `matrix`; missing cells stay missing.
    pub fn transform(&self, matrix: &DataMatrix) -> Result<DataMatrix> {
        if matrix.n_cols() != self.ranges.len() {
            return Err(ImputationError::shape(
                format!("{} columns", self.ranges.len()),
                format!("{} columns", matrix.n_cols()),
            ));
        }

        let rows = matrix
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(c, cell)| cell.map(|v| self.normalize_value(c, v)))
                    .collect()
            })
            .collect();

        DataMatrix::new(matrix.columns().to_vec(), rows)
    }
}
