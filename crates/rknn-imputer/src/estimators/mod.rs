//! Feature-importance estimators.
//!
//! The ranker treats one column as the target and asks an estimator how
//! strongly each remaining column relates to it. Any type implementing
//! [`ImportanceEstimator`] can be plugged in; the imputer never looks inside.
//!
//! Provided strategies:
//! - [`ReliefF`] - relevance filter over a fixed number of nearest neighbors
//! - [`MultiSurf`] - relevance filter with an adaptive neighborhood radius
//! - [`RandomForestImportance`] - impurity decrease of bootstrapped regression trees
//!
//! Estimators are produced through an [`EstimatorFactory`], so each ranking
//! call fits a fresh instance and no fitted state leaks between calls.

mod forest;
mod relief;

pub use forest::RandomForestImportance;
pub use relief::{MultiSurf, ReliefF};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons an estimator can refuse to fit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimatorError {
    /// No predictor columns were left after exclusions.
    #[error("no predictor features to rank")]
    EmptyPredictors,

    /// Too few rows to compare instances.
    #[error("at least 2 samples are required, got {samples}")]
    TooFewSamples { samples: usize },

    /// The target never varies across the training rows.
    #[error("target feature is constant across complete rows")]
    ConstantTarget,

    /// Predictor rows and target length disagree.
    #[error("predictor rows ({rows}) do not match target length ({targets})")]
    LengthMismatch { rows: usize, targets: usize },

    /// The estimator reported a different number of importances than predictors.
    #[error("estimator returned {actual} importances for {expected} predictors")]
    ImportanceCount { expected: usize, actual: usize },

    /// The estimator produced NaN or infinite scores.
    #[error("estimator produced a non-finite importance for predictor {index}")]
    NonFiniteImportance { index: usize },

    /// Estimator-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Capability of fitting on (predictors, target) and reporting one importance
/// per predictor column.
///
/// `predictors` is row-major: `predictors[i][j]` is feature `j` of sample `i`.
pub trait ImportanceEstimator {
    /// Fit the estimator.
    fn fit(&mut self, predictors: &[Vec<f64>], target: &[f64]) -> Result<(), EstimatorError>;

    /// Importances aligned with the predictor columns of the last fit.
    fn feature_importances(&self) -> Option<&[f64]>;

    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;
}

/// Builds a fresh estimator for every ranking call.
pub trait EstimatorFactory: Send + Sync {
    fn build(&self) -> Box<dyn ImportanceEstimator>;
}

impl<F> EstimatorFactory for F
where
    F: Fn() -> Box<dyn ImportanceEstimator> + Send + Sync,
{
    fn build(&self) -> Box<dyn ImportanceEstimator> {
        self()
    }
}

/// Built-in estimator strategies, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorKind {
    /// ReliefF with a fixed neighbor count.
    #[serde(rename = "relieff")]
    ReliefF {
        /// Neighbors considered per instance.
        n_neighbors: usize,
    },
    /// MultiSURF with adaptive neighborhoods.
    #[default]
    #[serde(rename = "multisurf")]
    MultiSurf,
    /// Random forest impurity importances.
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_leaf: usize,
        /// Features tried per split; `None` means all of them.
        max_features: Option<usize>,
        seed: u64,
    },
}

impl EstimatorKind {
    /// ReliefF with the usual 10 neighbors.
    pub fn relieff() -> Self {
        Self::ReliefF { n_neighbors: 10 }
    }

    /// Random forest with 100 fully grown trees.
    pub fn random_forest() -> Self {
        Self::RandomForest {
            n_estimators: 100,
            max_depth: None,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Check the strategy parameters.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::ReliefF { n_neighbors: 0 } => {
                Err("ReliefF needs at least 1 neighbor".to_string())
            }
            Self::RandomForest {
                n_estimators: 0, ..
            } => Err("random forest needs at least 1 tree".to_string()),
            Self::RandomForest {
                min_samples_leaf: 0,
                ..
            } => Err("random forest min_samples_leaf must be at least 1".to_string()),
            Self::RandomForest {
                max_features: Some(0),
                ..
            } => Err("random forest max_features must be at least 1".to_string()),
            _ => Ok(()),
        }
    }
}

impl EstimatorFactory for EstimatorKind {
    fn build(&self) -> Box<dyn ImportanceEstimator> {
        match *self {
            Self::ReliefF { n_neighbors } => Box::new(ReliefF::new(n_neighbors)),
            Self::MultiSurf => Box::new(MultiSurf::new()),
            Self::RandomForest {
                n_estimators,
                max_depth,
                min_samples_leaf,
                max_features,
                seed,
            } => {
                let mut forest = RandomForestImportance::new(n_estimators)
                    .with_min_samples_leaf(min_samples_leaf)
                    .with_seed(seed);
                if let Some(depth) = max_depth {
                    forest = forest.with_max_depth(depth);
                }
                if let Some(features) = max_features {
                    forest = forest.with_max_features(features);
                }
                Box::new(forest)
            }
        }
    }
}

/// Shared input checks for the built-in estimators. Returns the number of
/// predictor columns.
pub(crate) fn check_training_set(
    predictors: &[Vec<f64>],
    target: &[f64],
) -> Result<usize, EstimatorError> {
    if predictors.len() != target.len() {
        return Err(EstimatorError::LengthMismatch {
            rows: predictors.len(),
            targets: target.len(),
        });
    }
    if predictors.len() < 2 {
        return Err(EstimatorError::TooFewSamples {
            samples: predictors.len(),
        });
    }
    let n_features = predictors[0].len();
    if n_features == 0 {
        return Err(EstimatorError::EmptyPredictors);
    }
    if let Some(row) = predictors.iter().find(|row| row.len() != n_features) {
        return Err(EstimatorError::Other(format!(
            "ragged predictor rows: expected {n_features} features, found {}",
            row.len()
        )));
    }
    Ok(n_features)
}
