//! Imputation module for handling missing values.
//!
//! This module provides the ranked nearest-neighbor imputer, which picks
//! predictors per target column with an importance estimator and the elbow
//! cutoff, then averages the closest complete rows.

mod rank_knn;

pub use rank_knn::RankKnnImputer;
