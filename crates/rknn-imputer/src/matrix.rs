//! Numeric matrix with typed missing markers.
//!
//! Every cell is `Option<f64>`: `None` is the missing marker. NaN inputs are
//! folded into `None` when a matrix is built, infinities are rejected. The
//! polars boundary lives here too, so the algorithm never sees a DataFrame.

use crate::error::{ImputationError, Result, ResultExt};
use polars::prelude::*;

/// Rows of optional numeric cells with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl DataMatrix {
    /// Build a matrix from named columns and row-major cells.
    ///
    /// # Errors
    ///
    /// [`ImputationError::ShapeMismatch`] for ragged rows and
    /// [`ImputationError::NonFiniteValue`] for infinite cells.
    pub fn new(columns: Vec<String>, mut rows: Vec<Vec<Option<f64>>>) -> Result<Self> {
        let n_cols = columns.len();
        for (row_idx, row) in rows.iter_mut().enumerate() {
            if row.len() != n_cols {
                return Err(ImputationError::shape(
                    format!("{n_cols} cells in every row"),
                    format!("{} cells in row {row_idx}", row.len()),
                ));
            }
            for (col_idx, cell) in row.iter_mut().enumerate() {
                match *cell {
                    Some(v) if v.is_nan() => *cell = None,
                    Some(v) if v.is_infinite() => {
                        return Err(ImputationError::NonFiniteValue {
                            row: row_idx,
                            column: col_idx,
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(Self { columns, rows })
    }

    /// Build a matrix with generated column names (`column_0`, `column_1`, ...).
    pub fn from_rows(rows: Vec<Vec<Option<f64>>>) -> Result<Self> {
        let n_cols = rows.first().map_or(0, Vec::len);
        let columns = (0..n_cols).map(|c| format!("column_{c}")).collect();
        Self::new(columns, rows)
    }

    /// Read every column of a DataFrame. Nulls and NaN become missing markers.
    ///
    /// # Errors
    ///
    /// [`ImputationError::NonNumericColumn`] if any column is not integer or float.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let n_rows = df.height();
        let n_cols = df.width();
        let mut rows = vec![vec![None; n_cols]; n_rows];
        let mut columns = Vec::with_capacity(n_cols);

        for (col_idx, column) in df.get_columns().iter().enumerate() {
            if !is_numeric_dtype(column.dtype()) {
                return Err(ImputationError::NonNumericColumn {
                    column: column.name().to_string(),
                    dtype: column.dtype().to_string(),
                });
            }
            columns.push(column.name().to_string());

            let float_column = column
                .cast(&DataType::Float64)
                .context(format!("Casting column '{}' to Float64", column.name()))?;
            let values = float_column.f64()?;
            for (row_idx, row) in rows.iter_mut().enumerate() {
                row[col_idx] = values.get(row_idx);
            }
        }

        Self::new(columns, rows)
    }

    /// Convert back to a DataFrame of Float64 columns. Missing cells become nulls.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                let values: Vec<Option<f64>> = self.rows.iter().map(|row| row[c]).collect();
                Column::from(Series::new(name.as_str().into(), values))
            })
            .collect();
        DataFrame::new(columns).context("Building DataFrame from matrix")
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> &[Option<f64>] {
        &self.rows[row]
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(column).copied().flatten())
    }

    pub(crate) fn set(&mut self, row: usize, column: usize, value: Option<f64>) {
        self.rows[row][column] = value;
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().filter(|c| c.is_none()).count())
            .sum()
    }

    pub fn has_missing(&self) -> bool {
        self.rows.iter().any(|row| row.iter().any(Option::is_none))
    }

    /// Detect which rows and columns hold missing markers.
    pub fn missing_structure(&self) -> MissingStructure {
        MissingStructure::detect(self)
    }

    /// Dense copy of the given rows. Callers must only pass complete rows.
    pub(crate) fn dense_rows(&self, indices: &[usize]) -> Vec<Vec<f64>> {
        indices
            .iter()
            .map(|&r| self.rows[r].iter().map(|c| c.unwrap_or(f64::NAN)).collect())
            .collect()
    }
}

/// Missing-value layout of a matrix, fixed at detection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingStructure {
    /// Rows holding at least one missing marker, ascending
    pub missing_rows: Vec<usize>,
    /// Columns holding at least one missing marker, ascending
    pub missing_columns: Vec<usize>,
    /// Rows without missing markers, ascending
    pub complete_rows: Vec<usize>,
    /// Columns without missing markers, ascending
    pub complete_columns: Vec<usize>,
    by_row: Vec<Vec<usize>>,
    by_column: Vec<Vec<usize>>,
}

impl MissingStructure {
    /// Single pass over every cell.
    pub fn detect(matrix: &DataMatrix) -> Self {
        let (n_rows, n_cols) = matrix.shape();
        let mut by_row = vec![Vec::new(); n_rows];
        let mut by_column = vec![Vec::new(); n_cols];

        for (r, row) in matrix.rows().iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_none() {
                    by_row[r].push(c);
                    by_column[c].push(r);
                }
            }
        }

        let (missing_rows, complete_rows): (Vec<usize>, Vec<usize>) =
            (0..n_rows).partition(|&r| !by_row[r].is_empty());
        let (missing_columns, complete_columns): (Vec<usize>, Vec<usize>) =
            (0..n_cols).partition(|&c| !by_column[c].is_empty());

        Self {
            missing_rows,
            missing_columns,
            complete_rows,
            complete_columns,
            by_row,
            by_column,
        }
    }

    /// Columns missing in `row`, ascending.
    pub fn missing_in_row(&self, row: usize) -> &[usize] {
        &self.by_row[row]
    }

    /// Rows missing in `column`, ascending.
    pub fn missing_in_column(&self, column: usize) -> &[usize] {
        &self.by_column[column]
    }

    /// Total number of missing cells.
    pub fn missing_cells(&self) -> usize {
        self.by_column.iter().map(Vec::len).sum()
    }

    pub fn has_missing(&self) -> bool {
        !self.missing_columns.is_empty()
    }
}

/// Check if a DataType is numeric (integer or float).
#[inline]
fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}
