use crate::config::{FailurePolicy, ImputerConfig, ZeroDistancePolicy};
use crate::error::{ImputationError, Result};
use crate::estimators::{EstimatorError, EstimatorFactory};
use crate::matrix::{DataMatrix, MissingStructure};
use crate::normalizer::MinMaxNormalizer;
use crate::selection::{self, FeatureRanker, Neighbor};
use crate::types::{
    CellFailure, CellImputation, ColumnReport, ImputationOutcome, ImputationReport,
    ImputationStrategy,
};
use polars::prelude::DataFrame;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Predictor selection for one target, or the estimator error that prevented it.
type Selection = std::result::Result<Vec<usize>, EstimatorError>;

/// Ranked nearest-neighbor imputer.
///
/// Each call re-derives everything from the matrix it is given: missing
/// structure, normalization, rankings and donors. Nothing fitted survives
/// between calls.
pub struct RankKnnImputer {
    config: ImputerConfig,
    estimator: Box<dyn EstimatorFactory>,
}

impl RankKnnImputer {
    /// Create an imputer using the estimator named in the configuration.
    pub fn new(config: ImputerConfig) -> Result<Self> {
        let estimator = Box::new(config.estimator);
        Self::with_estimator(config, estimator)
    }

    /// Create an imputer with a custom estimator factory. The `estimator`
    /// field of the configuration is ignored.
    pub fn with_estimator(
        config: ImputerConfig,
        estimator: Box<dyn EstimatorFactory>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ImputationError::InvalidConfig(e.to_string()))?;
        Ok(Self { config, estimator })
    }

    pub fn config(&self) -> &ImputerConfig {
        &self.config
    }

    /// Fail with [`ImputationError::NoMissingValues`] if `matrix` has nothing to impute.
    pub fn validate(&self, matrix: &DataMatrix) -> Result<()> {
        if !matrix.has_missing() {
            return Err(ImputationError::NoMissingValues);
        }
        Ok(())
    }

    /// Impute every missing cell and return the filled matrix.
    ///
    /// Under [`FailurePolicy::Skip`] cells whose ranking failed stay missing
    /// and no report is returned; use [`Self::impute_with_report`] to see them.
    pub fn impute(&self, matrix: &DataMatrix) -> Result<DataMatrix> {
        self.impute_with_report(matrix).map(|outcome| outcome.matrix)
    }

    /// Validate, impute and convert back to a DataFrame.
    pub fn fit_transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let matrix = DataMatrix::from_dataframe(df)?;
        self.validate(&matrix)?;
        self.impute(&matrix)?.to_dataframe()
    }

    /// Impute every missing cell and describe what was done.
    ///
    /// A matrix without missing values is returned unchanged. Under
    /// [`FailurePolicy::Skip`] the returned matrix may still hold missing
    /// cells; they are listed in `report.failures`.
    pub fn impute_with_report(&self, matrix: &DataMatrix) -> Result<ImputationOutcome> {
        let start = Instant::now();
        let structure = matrix.missing_structure();

        let mut report = ImputationReport {
            rows: matrix.n_rows(),
            columns: matrix.n_cols(),
            complete_rows: structure.complete_rows.len(),
            missing_cells: structure.missing_cells(),
            ..Default::default()
        };

        if !structure.has_missing() {
            debug!("No missing values, returning input unchanged");
            report.duration_ms = start.elapsed().as_millis() as u64;
            return Ok(ImputationOutcome {
                matrix: matrix.clone(),
                report,
            });
        }

        if structure.complete_rows.is_empty() {
            return Err(ImputationError::NoCompleteRows);
        }

        let normalizer = MinMaxNormalizer::fit(matrix);
        let normalized = normalizer.transform(matrix)?;

        let mut run = Run {
            config: &self.config,
            structure: &structure,
            normalized: &normalized,
            donors_normalized: normalized.dense_rows(&structure.complete_rows),
            donors_original: matrix.dense_rows(&structure.complete_rows),
            ranker: FeatureRanker::new(self.estimator.as_ref())
                .with_cache(self.config.cache_rankings),
            output: matrix.clone(),
            report,
        };

        for &column in &structure.missing_columns {
            run.impute_column(column, &matrix.columns()[column])?;
        }

        let Run {
            output,
            mut report,
            ranker,
            ..
        } = run;
        report.estimator_fits = ranker.fits();
        report.ranking_cache_hits = ranker.cache_hits();
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Imputed {} of {} missing cells across {} columns ({} estimator fits, {} cache hits) in {}ms",
            report.cells.len(),
            report.missing_cells,
            report.column_reports.len(),
            report.estimator_fits,
            report.ranking_cache_hits,
            report.duration_ms
        );

        Ok(ImputationOutcome {
            matrix: output,
            report,
        })
    }
}

/// State of one imputation call.
///
/// Donor views are fixed before any write, so imputed values are never read
/// back as observations.
struct Run<'a> {
    config: &'a ImputerConfig,
    structure: &'a MissingStructure,
    normalized: &'a DataMatrix,
    donors_normalized: Vec<Vec<f64>>,
    donors_original: Vec<Vec<f64>>,
    ranker: FeatureRanker<'a>,
    output: DataMatrix,
    report: ImputationReport,
}

impl Run<'_> {
    fn impute_column(&mut self, column: usize, name: &str) -> Result<()> {
        let base = self.select_predictors(column, &BTreeSet::new())?;
        debug!("Column '{}': base predictors {:?}", name, base);

        self.report.column_reports.push(ColumnReport {
            column,
            name: name.to_string(),
            missing_count: self.structure.missing_in_column(column).len(),
            base_predictors: base.clone().unwrap_or_default(),
        });

        let structure = self.structure;
        for &row in structure.missing_in_column(column) {
            let co_missing: BTreeSet<usize> = structure
                .missing_in_row(row)
                .iter()
                .copied()
                .filter(|&c| c != column)
                .collect();

            let reranked = !co_missing.is_empty();
            let picked = if reranked {
                self.select_predictors(column, &co_missing)?
            } else {
                base.clone()
            };

            match picked {
                Ok(predictors) => self.impute_cell(row, column, predictors, reranked)?,
                Err(source) => {
                    let failure = ImputationError::EstimatorFitFailure {
                        column,
                        row: reranked.then_some(row),
                        source,
                    };
                    self.handle_failure(row, column, failure)?;
                }
            }
        }

        Ok(())
    }

    /// Rank the predictors of `target` with `exclude` removed and cut at the elbow.
    fn select_predictors(&mut self, target: usize, exclude: &BTreeSet<usize>) -> Result<Selection> {
        match self.ranker.rank(&self.donors_normalized, target, exclude) {
            Ok(ranking) => Ok(Ok(ranking.select()?)),
            Err(e) => Ok(Err(e)),
        }
    }

    fn impute_cell(
        &mut self,
        row: usize,
        column: usize,
        predictors: Vec<usize>,
        reranked: bool,
    ) -> Result<()> {
        let neighbors = selection::nearest_donors(
            self.normalized.row(row),
            &self.donors_normalized,
            &predictors,
        )?;
        let chosen = self.choose_donors(row, column, &neighbors)?;

        let value = self.donor_mean(column, &chosen);
        self.output.set(row, column, Some(value));

        debug!(
            "Row {} column {}: {} donors, value {:.4}{}",
            row,
            column,
            chosen.len(),
            value,
            if reranked { " (re-ranked)" } else { "" }
        );

        let donors = chosen
            .iter()
            .map(|&d| self.structure.complete_rows[d])
            .collect();
        self.report.cells.push(CellImputation {
            row,
            column,
            value,
            strategy: ImputationStrategy::RankedNeighbors,
            predictors,
            donors,
            reranked,
        });
        Ok(())
    }

    /// Donor positions to average, nearest first.
    fn choose_donors(
        &self,
        row: usize,
        column: usize,
        neighbors: &[Neighbor],
    ) -> Result<Vec<usize>> {
        if let Some(k) = self.config.k {
            return Ok(neighbors.iter().take(k).map(|n| n.donor).collect());
        }

        let exact: Vec<usize> = neighbors
            .iter()
            .take_while(|n| n.distance == 0.0)
            .map(|n| n.donor)
            .collect();

        if let Some(&first) = exact.first() {
            match self.config.zero_distance_policy {
                ZeroDistancePolicy::Cap => {}
                ZeroDistancePolicy::ExactMatches => return Ok(exact),
                ZeroDistancePolicy::Reject => {
                    return Err(ImputationError::ZeroDistanceCollision {
                        row,
                        column,
                        donor: self.structure.complete_rows[first],
                    });
                }
            }
        }

        let scores = selection::inverse_distances(neighbors, self.config.min_distance);
        let donors: Vec<usize> = neighbors.iter().map(|n| n.donor).collect();
        Ok(selection::select(&scores, &donors)?.to_vec())
    }

    fn donor_mean(&self, column: usize, donors: &[usize]) -> f64 {
        let sum: f64 = donors
            .iter()
            .map(|&d| self.donors_original[d][column])
            .sum();
        sum / donors.len() as f64
    }

    fn handle_failure(
        &mut self,
        row: usize,
        column: usize,
        failure: ImputationError,
    ) -> Result<()> {
        match self.config.on_estimator_failure {
            FailurePolicy::Abort => Err(failure),
            FailurePolicy::Skip => {
                warn!("{}; leaving row {} column {} missing", failure, row, column);
                self.report.failures.push(CellFailure {
                    row,
                    column,
                    reason: failure.to_string(),
                    filled_with: None,
                });
                Ok(())
            }
            FailurePolicy::CompleteCaseMean => {
                let all: Vec<usize> = (0..self.donors_original.len()).collect();
                let value = self.donor_mean(column, &all);
                warn!(
                    "{}; filling row {} column {} with complete-case mean {:.4}",
                    failure, row, column, value
                );
                self.output.set(row, column, Some(value));
                self.report.failures.push(CellFailure {
                    row,
                    column,
                    reason: failure.to_string(),
                    filled_with: Some(value),
                });
                self.report.cells.push(CellImputation {
                    row,
                    column,
                    value,
                    strategy: ImputationStrategy::CompleteCaseMean,
                    predictors: Vec::new(),
                    donors: self.structure.complete_rows.clone(),
                    reranked: false,
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::{EstimatorKind, ImportanceEstimator};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    /// Gives every predictor the same score and records the predictor width
    /// of each fit.
    struct Uniform {
        widths: Arc<Mutex<Vec<usize>>>,
        importances: Option<Vec<f64>>,
    }

    impl ImportanceEstimator for Uniform {
        fn fit(
            &mut self,
            predictors: &[Vec<f64>],
            _target: &[f64],
        ) -> std::result::Result<(), EstimatorError> {
            let width = predictors[0].len();
            self.widths.lock().unwrap().push(width);
            self.importances = Some(vec![1.0; width]);
            Ok(())
        }

        fn feature_importances(&self) -> Option<&[f64]> {
            self.importances.as_deref()
        }

        fn name(&self) -> &'static str {
            "uniform"
        }
    }

    fn uniform() -> (Box<dyn EstimatorFactory>, Arc<Mutex<Vec<usize>>>) {
        let widths = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&widths);
        let factory = move || {
            Box::new(Uniform {
                widths: Arc::clone(&shared),
                importances: None,
            }) as Box<dyn ImportanceEstimator>
        };
        (Box::new(factory), widths)
    }

    /// Always refuses to fit.
    struct Broken;

    impl ImportanceEstimator for Broken {
        fn fit(&mut self, _: &[Vec<f64>], _: &[f64]) -> std::result::Result<(), EstimatorError> {
            Err(EstimatorError::ConstantTarget)
        }

        fn feature_importances(&self) -> Option<&[f64]> {
            None
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn broken() -> Box<dyn EstimatorFactory> {
        Box::new(|| Box::new(Broken) as Box<dyn ImportanceEstimator>)
    }

    fn imputer(config: ImputerConfig) -> RankKnnImputer {
        let (factory, _) = uniform();
        RankKnnImputer::with_estimator(config, factory).unwrap()
    }

    fn fixed_k(k: usize) -> ImputerConfig {
        ImputerConfig::builder().k(k).build().unwrap()
    }

    /// Complete rows 0, 1, 3, 4 carry 10, 20, 30, 40 in column 1. Row 2 is
    /// missing column 1 and sits on row 0, next to row 4.
    fn five_by_three() -> DataMatrix {
        DataMatrix::from_rows(vec![
            vec![Some(1.0), Some(10.0), Some(1.0)],
            vec![Some(5.0), Some(20.0), Some(5.0)],
            vec![Some(1.0), None, Some(1.0)],
            vec![Some(9.0), Some(30.0), Some(9.0)],
            vec![Some(1.0), Some(40.0), Some(1.1)],
        ])
        .unwrap()
    }

    // ========================================================================
    // Validation tests
    // ========================================================================

    #[test]
    fn test_validate_complete_matrix() {
        let matrix = DataMatrix::from_rows(vec![vec![Some(1.0)], vec![Some(2.0)]]).unwrap();
        let result = imputer(ImputerConfig::default()).validate(&matrix);
        assert!(matches!(result, Err(ImputationError::NoMissingValues)));
    }

    #[test]
    fn test_validate_with_missing() {
        assert!(imputer(ImputerConfig::default()).validate(&five_by_three()).is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ImputerConfig {
            k: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            RankKnnImputer::new(config),
            Err(ImputationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_complete_matrix_returned_unchanged() {
        let matrix = DataMatrix::from_rows(vec![vec![Some(1.0)], vec![Some(2.0)]]).unwrap();
        let outcome = imputer(ImputerConfig::default())
            .impute_with_report(&matrix)
            .unwrap();
        assert_eq!(outcome.matrix, matrix);
        assert!(outcome.report.cells.is_empty());
    }

    #[test]
    fn test_no_complete_rows() {
        let matrix = DataMatrix::from_rows(vec![
            vec![None, Some(1.0)],
            vec![Some(2.0), None],
        ])
        .unwrap();
        let result = imputer(ImputerConfig::default()).impute(&matrix);
        assert!(matches!(result, Err(ImputationError::NoCompleteRows)));
    }

    // ========================================================================
    // Neighbor count tests
    // ========================================================================

    #[test]
    fn test_fixed_k_two_averages_nearest_donors() {
        let outcome = imputer(fixed_k(2))
            .impute_with_report(&five_by_three())
            .unwrap();

        assert_eq!(outcome.matrix.get(2, 1), Some(25.0));
        let cell = &outcome.report.cells[0];
        assert_eq!(cell.donors, vec![0, 4]);
        assert_eq!(cell.predictors, vec![0, 2]);
        assert!(!cell.reranked);
    }

    #[test]
    fn test_hot_deck_uses_single_nearest() {
        let result = imputer(fixed_k(1)).impute(&five_by_three()).unwrap();
        assert_eq!(result.get(2, 1), Some(10.0));
    }

    #[test]
    fn test_large_k_gives_complete_case_mean() {
        let result = imputer(fixed_k(50)).impute(&five_by_three()).unwrap();
        assert_eq!(result.get(2, 1), Some(25.0));

        let result = imputer(fixed_k(4)).impute(&five_by_three()).unwrap();
        assert_eq!(result.get(2, 1), Some(25.0));
    }

    #[test]
    fn test_automatic_k_caps_zero_distance() {
        let outcome = imputer(ImputerConfig::default())
            .impute_with_report(&five_by_three())
            .unwrap();

        let value = outcome.matrix.get(2, 1).unwrap();
        assert!(value.is_finite());
        // The coincident donor dominates the inverse distances
        assert_eq!(outcome.report.cells[0].donors[0], 0);
    }

    #[test]
    fn test_automatic_k_exact_matches() {
        let config = ImputerConfig::builder()
            .zero_distance_policy(ZeroDistancePolicy::ExactMatches)
            .build()
            .unwrap();
        let outcome = imputer(config).impute_with_report(&five_by_three()).unwrap();
        assert_eq!(outcome.matrix.get(2, 1), Some(10.0));
        assert_eq!(outcome.report.cells[0].donors, vec![0]);
    }

    #[test]
    fn test_automatic_k_rejects_zero_distance() {
        let config = ImputerConfig::builder()
            .zero_distance_policy(ZeroDistancePolicy::Reject)
            .build()
            .unwrap();
        let result = imputer(config).impute(&five_by_three());
        assert!(matches!(
            result,
            Err(ImputationError::ZeroDistanceCollision {
                row: 2,
                column: 1,
                donor: 0
            })
        ));
    }

    #[test]
    fn test_fixed_k_ignores_zero_distance_policy() {
        let config = ImputerConfig::builder()
            .k(2)
            .zero_distance_policy(ZeroDistancePolicy::Reject)
            .build()
            .unwrap();
        let result = imputer(config).impute(&five_by_three()).unwrap();
        assert_eq!(result.get(2, 1), Some(25.0));
    }

    #[test]
    fn test_automatic_k_picks_elbow_of_inverse_distances() {
        // Rows 1-3 tie closest to the query, rows 0, 4 and 5 trail off
        let matrix = DataMatrix::from_rows(vec![
            vec![Some(0.0), Some(0.0)],
            vec![Some(1.0), Some(2.0)],
            vec![Some(1.0), Some(4.0)],
            vec![Some(1.0), Some(6.0)],
            vec![Some(10.0), Some(100.0)],
            vec![Some(20.0), Some(200.0)],
            vec![Some(2.0), None],
        ])
        .unwrap();
        let outcome = imputer(ImputerConfig::default())
            .impute_with_report(&matrix)
            .unwrap();

        let cell = &outcome.report.cells[0];
        assert_eq!(cell.donors, vec![1, 2, 3]);
        assert_eq!(cell.value, 4.0);
    }

    // ========================================================================
    // Co-missing tests
    // ========================================================================

    #[test]
    fn test_co_missing_columns_are_excluded() {
        let matrix = DataMatrix::from_rows(vec![
            vec![Some(0.0), Some(1.0), Some(2.0), Some(3.0)],
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            vec![Some(2.0), Some(3.0), Some(4.0), Some(5.0)],
            vec![Some(3.0), Some(4.0), Some(5.0), Some(6.0)],
            vec![None, None, Some(4.5), Some(5.5)],
            vec![Some(0.5), None, Some(2.5), Some(3.5)],
        ])
        .unwrap();
        let (factory, widths) = uniform();
        let imputer = RankKnnImputer::with_estimator(fixed_k(2), factory).unwrap();
        let outcome = imputer.impute_with_report(&matrix).unwrap();

        assert!(!outcome.matrix.has_missing());

        let cells = &outcome.report.cells;
        // Column 0, row 4: column 1 is co-missing
        assert_eq!((cells[0].row, cells[0].column), (4, 0));
        assert!(cells[0].reranked);
        assert_eq!(cells[0].predictors, vec![2, 3]);
        // Column 1, row 4: column 0 is co-missing
        assert_eq!((cells[1].row, cells[1].column), (4, 1));
        assert!(cells[1].reranked);
        assert_eq!(cells[1].predictors, vec![2, 3]);
        // Column 1, row 5: only the target is missing
        assert_eq!((cells[2].row, cells[2].column), (5, 1));
        assert!(!cells[2].reranked);
        assert_eq!(cells[2].predictors, vec![0, 2, 3]);

        // Base rankings see 3 predictors, re-rankings see 2
        assert_eq!(*widths.lock().unwrap(), vec![3, 2, 3, 2]);
        assert_eq!(outcome.report.reranked(), 2);
    }

    #[test]
    fn test_ranking_cache_reuses_signatures() {
        // Rows 3 and 4 share the same co-missing pair
        let matrix = DataMatrix::from_rows(vec![
            vec![Some(0.0), Some(1.0), Some(2.0)],
            vec![Some(1.0), Some(3.0), Some(1.0)],
            vec![Some(2.0), Some(2.0), Some(0.0)],
            vec![None, None, Some(1.5)],
            vec![None, None, Some(0.5)],
        ])
        .unwrap();

        let (factory, _) = uniform();
        let cached = RankKnnImputer::with_estimator(fixed_k(1), factory).unwrap();
        let report = cached.impute_with_report(&matrix).unwrap().report;
        assert_eq!(report.estimator_fits, 4);
        assert_eq!(report.ranking_cache_hits, 2);

        let (factory, _) = uniform();
        let config = ImputerConfig::builder()
            .k(1)
            .cache_rankings(false)
            .build()
            .unwrap();
        let uncached = RankKnnImputer::with_estimator(config, factory).unwrap();
        let report = uncached.impute_with_report(&matrix).unwrap().report;
        assert_eq!(report.estimator_fits, 6);
        assert_eq!(report.ranking_cache_hits, 0);
    }

    #[test]
    fn test_imputed_values_not_reused_as_donors() {
        let matrix = DataMatrix::from_rows(vec![
            vec![Some(0.0), Some(0.0), Some(0.0)],
            vec![Some(1.0), Some(10.0), Some(1.0)],
            vec![Some(2.0), Some(20.0), Some(2.0)],
            vec![Some(1.0), None, None],
        ])
        .unwrap();
        let outcome = imputer(fixed_k(1)).impute_with_report(&matrix).unwrap();
        for cell in &outcome.report.cells {
            assert!(cell.donors.iter().all(|d| [0, 1, 2].contains(d)));
        }
        assert_eq!(outcome.matrix.get(3, 1), Some(10.0));
        assert_eq!(outcome.matrix.get(3, 2), Some(1.0));
    }

    // ========================================================================
    // Failure policy tests
    // ========================================================================

    #[test]
    fn test_estimator_failure_abort() {
        let config = ImputerConfig::builder()
            .k(2)
            .on_estimator_failure(FailurePolicy::Abort)
            .build()
            .unwrap();
        let imputer = RankKnnImputer::with_estimator(config, broken()).unwrap();
        let err = imputer.impute(&five_by_three()).unwrap_err();
        assert!(err.is_estimator_failure());
        assert!(matches!(
            err,
            ImputationError::EstimatorFitFailure {
                column: 1,
                row: None,
                ..
            }
        ));
    }

    #[test]
    fn test_estimator_failure_skip() {
        let config = ImputerConfig::builder()
            .on_estimator_failure(FailurePolicy::Skip)
            .build()
            .unwrap();
        let imputer = RankKnnImputer::with_estimator(config, broken()).unwrap();
        let outcome = imputer.impute_with_report(&five_by_three()).unwrap();

        assert_eq!(outcome.matrix.get(2, 1), None);
        assert_eq!(outcome.report.unfilled(), 1);
        assert!(outcome.report.cells.is_empty());
        assert!(outcome.report.column_reports[0].base_predictors.is_empty());
        let filled = imputer.impute(&five_by_three()).unwrap();
        assert!(filled.has_missing());
    }

    #[test]
    fn test_estimator_failure_complete_case_mean() {
        let config = ImputerConfig::builder()
            .on_estimator_failure(FailurePolicy::CompleteCaseMean)
            .build()
            .unwrap();
        let imputer = RankKnnImputer::with_estimator(config, broken()).unwrap();
        let outcome = imputer.impute_with_report(&five_by_three()).unwrap();

        assert_eq!(outcome.matrix.get(2, 1), Some(25.0));
        assert_eq!(outcome.report.fallback_imputations(), 1);
        assert_eq!(outcome.report.failures[0].filled_with, Some(25.0));
        assert_eq!(outcome.report.cells[0].donors, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_default_config_falls_back_on_constant_target() {
        // Column 2 is constant across the complete rows
        let matrix = DataMatrix::from_rows(vec![
            vec![Some(1.0), Some(10.0), Some(7.0)],
            vec![Some(2.0), Some(20.0), Some(7.0)],
            vec![Some(3.0), Some(30.0), Some(7.0)],
            vec![Some(4.0), Some(40.0), Some(7.0)],
            vec![None, Some(25.0), Some(7.0)],
            vec![Some(5.0), Some(50.0), None],
        ])
        .unwrap();

        let imputer = RankKnnImputer::new(ImputerConfig::default()).unwrap();
        let outcome = imputer.impute_with_report(&matrix).unwrap();
        assert!(!outcome.matrix.has_missing());

        let neighbor_cell = outcome
            .report
            .cells
            .iter()
            .find(|c| c.row == 4 && c.column == 0)
            .unwrap();
        assert_eq!(neighbor_cell.strategy, ImputationStrategy::RankedNeighbors);
        assert!((1.0..=4.0).contains(&neighbor_cell.value));

        assert_eq!(outcome.matrix.get(5, 2), Some(7.0));
        assert_eq!(outcome.report.fallback_imputations(), 1);
        assert_eq!(outcome.report.failures.len(), 1);
        assert_eq!(outcome.report.failures[0].column, 2);
        assert_eq!(outcome.report.failures[0].filled_with, Some(7.0));
    }

    #[test]
    fn test_default_config_with_two_complete_rows() {
        let matrix = DataMatrix::from_rows(vec![
            vec![Some(1.0), Some(10.0)],
            vec![Some(3.0), Some(30.0)],
            vec![None, Some(20.0)],
        ])
        .unwrap();

        let imputer = RankKnnImputer::new(ImputerConfig::default()).unwrap();
        let outcome = imputer.impute_with_report(&matrix).unwrap();

        assert_eq!(outcome.matrix.get(2, 0), Some(2.0));
        assert!(outcome.report.failures.is_empty());
        assert_eq!(
            outcome.report.cells[0].strategy,
            ImputationStrategy::RankedNeighbors
        );
    }

    // ========================================================================
    // Built-in estimator tests
    // ========================================================================

    #[test]
    fn test_builtin_estimators_fill_every_cell() {
        let rows: Vec<Vec<Option<f64>>> = (0..24)
            .map(|i| {
                let x = i as f64;
                let noise = ((i * 5) % 7) as f64;
                let target = if i % 6 == 3 { None } else { Some(3.0 * x + 1.0) };
                vec![Some(x), Some(noise), target]
            })
            .collect();
        let matrix = DataMatrix::from_rows(rows).unwrap();

        for estimator in [
            EstimatorKind::MultiSurf,
            EstimatorKind::relieff(),
            EstimatorKind::RandomForest {
                n_estimators: 10,
                max_depth: Some(4),
                min_samples_leaf: 1,
                max_features: None,
                seed: 3,
            },
        ] {
            let config = ImputerConfig::builder()
                .k(2)
                .estimator(estimator)
                .build()
                .unwrap();
            let result = RankKnnImputer::new(config).unwrap().impute(&matrix).unwrap();
            assert!(!result.has_missing());
            assert!(result.rows().iter().flatten().all(|c| c.unwrap().is_finite()));
        }
    }

    #[test]
    fn test_fit_transform_dataframe() {
        let df = five_by_three().to_dataframe().unwrap();
        let result = imputer(fixed_k(2)).fit_transform(&df).unwrap();
        assert_eq!(result.column("column_1").unwrap().null_count(), 0);

        let complete = DataMatrix::from_rows(vec![vec![Some(1.0)], vec![Some(2.0)]])
            .unwrap()
            .to_dataframe()
            .unwrap();
        assert!(matches!(
            imputer(fixed_k(2)).fit_transform(&complete),
            Err(ImputationError::NoMissingValues)
        ));
    }
}
