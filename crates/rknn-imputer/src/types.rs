use crate::matrix::DataMatrix;
use serde::Serialize;

// ============================================================================
// Per-cell records
// ============================================================================

/// How a missing cell received its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    /// Mean of the nearest donors in the ranked predictor subspace
    RankedNeighbors,
    /// Mean of every complete row, used after an estimator failure
    CompleteCaseMean,
}

/// One filled cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellImputation {
    pub row: usize,
    pub column: usize,
    pub value: f64,
    pub strategy: ImputationStrategy,
    /// Predictor columns used for the distance, most important first.
    /// Empty for the complete-case fallback.
    pub predictors: Vec<usize>,
    /// Row indices (in the input matrix) of the donors that were averaged.
    pub donors: Vec<usize>,
    /// True when the predictors came from a per-row re-ranking that excluded
    /// other columns missing in the same row.
    pub reranked: bool,
}

/// A cell the estimator could not serve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellFailure {
    pub row: usize,
    pub column: usize,
    /// Estimator error message.
    pub reason: String,
    /// Value written by the fallback, `None` if the cell was left missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_with: Option<f64>,
}

// ============================================================================
// Run summary
// ============================================================================

/// Base selection for one column with missing entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnReport {
    pub column: usize,
    pub name: String,
    pub missing_count: usize,
    /// Elbow-selected predictors from the ranking that excludes only this
    /// column. Empty if that ranking failed.
    pub base_predictors: Vec<usize>,
}

/// What one imputation run did.
///
/// # Example
///
/// ```rust,ignore
/// let outcome = imputer.impute_with_report(&matrix)?;
/// println!(
///     "Filled {} of {} cells in {}ms",
///     outcome.report.cells.len(),
///     outcome.report.missing_cells,
///     outcome.report.duration_ms
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImputationReport {
    /// Number of rows in the input.
    pub rows: usize,
    /// Number of columns in the input.
    pub columns: usize,
    /// Rows with no missing values, used as donors.
    pub complete_rows: usize,
    /// Missing cells found before imputation.
    pub missing_cells: usize,

    /// One entry per column with missing values, ascending.
    pub column_reports: Vec<ColumnReport>,
    /// One entry per filled cell, in processing order.
    pub cells: Vec<CellImputation>,
    /// Cells handled by the estimator failure policy.
    pub failures: Vec<CellFailure>,

    /// Importance estimator fits performed.
    pub estimator_fits: usize,
    /// Rankings served from the cache.
    pub ranking_cache_hits: usize,
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
}

impl ImputationReport {
    /// Number of cells filled by ranked neighbors.
    pub fn neighbor_imputations(&self) -> usize {
        self.count_strategy(ImputationStrategy::RankedNeighbors)
    }

    /// Number of cells filled by the complete-case mean fallback.
    pub fn fallback_imputations(&self) -> usize {
        self.count_strategy(ImputationStrategy::CompleteCaseMean)
    }

    /// Number of cells left missing.
    pub fn unfilled(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.filled_with.is_none())
            .count()
    }

    /// Number of cells whose predictors came from a per-row re-ranking.
    pub fn reranked(&self) -> usize {
        self.cells.iter().filter(|c| c.reranked).count()
    }

    fn count_strategy(&self, strategy: ImputationStrategy) -> usize {
        self.cells.iter().filter(|c| c.strategy == strategy).count()
    }
}

/// Imputed matrix together with its report.
#[derive(Debug, Clone)]
pub struct ImputationOutcome {
    pub matrix: DataMatrix,
    pub report: ImputationReport,
}
