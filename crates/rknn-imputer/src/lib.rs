//! Ranked Nearest-Neighbor Imputation Library
//!
//! Fills missing entries of a numeric table by combining per-feature relevance
//! ranking with an adaptively sized nearest-neighbor average.
//!
//! # Overview
//!
//! For every column with missing entries the imputer:
//!
//! - **Ranks predictors**: fits an importance estimator on the complete rows,
//!   with the target column as label and every other column as a predictor
//! - **Trims the ranking**: keeps the prefix up to the elbow of the scores
//! - **Re-ranks when needed**: rows missing several columns get a ranking that
//!   excludes the other missing columns
//! - **Finds donors**: sorts complete rows by Euclidean distance in the
//!   normalized predictor subspace
//! - **Averages**: takes the mean of the donors' original-scale values, using
//!   either a fixed `k` or the elbow of the inverse distances
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rknn_imputer::{DataMatrix, ImputerConfig, RankKnnImputer};
//!
//! let matrix = DataMatrix::from_rows(vec![
//!     vec![Some(1.0), Some(10.0), Some(1.0)],
//!     vec![Some(5.0), Some(20.0), Some(5.0)],
//!     vec![Some(1.0), None, Some(1.0)],
//!     vec![Some(9.0), Some(30.0), Some(9.0)],
//! ])?;
//!
//! // Automatic neighbor count, MultiSURF rankings
//! let imputer = RankKnnImputer::new(ImputerConfig::default())?;
//! imputer.validate(&matrix)?;
//! let filled = imputer.impute(&matrix)?;
//!
//! // Fixed k with a report of every filled cell
//! let config = ImputerConfig::builder().k(2).build()?;
//! let outcome = RankKnnImputer::new(config)?.impute_with_report(&matrix)?;
//! println!("{}", serde_json::to_string_pretty(&outcome.report)?);
//! ```
//!
//! # Estimators
//!
//! Importance estimators implement [`estimators::ImportanceEstimator`] and are
//! supplied through an [`estimators::EstimatorFactory`], so every ranking fits
//! a fresh instance. Built-in strategies:
//!
//! - [`estimators::MultiSurf`] - the default
//! - [`estimators::ReliefF`]
//! - [`estimators::RandomForestImportance`]
//!
//! Any closure returning a boxed estimator is a factory:
//!
//! ```rust,ignore
//! use rknn_imputer::estimators::{ImportanceEstimator, ReliefF};
//!
//! let imputer = RankKnnImputer::with_estimator(
//!     ImputerConfig::default(),
//!     Box::new(|| Box::new(ReliefF::new(5)) as Box<dyn ImportanceEstimator>),
//! )?;
//! ```
//!
//! # DataFrames
//!
//! [`RankKnnImputer::fit_transform`] accepts a polars `DataFrame` of numeric
//! columns, where nulls and NaN are the missing markers, and returns a
//! DataFrame of Float64 columns.

pub mod config;
pub mod error;
pub mod estimators;
pub mod imputers;
pub mod matrix;
pub mod normalizer;
pub mod selection;
pub mod types;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, FailurePolicy, ImputerConfig, ImputerConfigBuilder, ZeroDistancePolicy,
};
pub use error::{ImputationError, Result as ImputationResult, ResultExt};
pub use estimators::{
    EstimatorError, EstimatorFactory, EstimatorKind, ImportanceEstimator, MultiSurf,
    RandomForestImportance, ReliefF,
};
pub use imputers::RankKnnImputer;
pub use matrix::{DataMatrix, MissingStructure};
pub use normalizer::{ColumnRange, MinMaxNormalizer};
pub use selection::{FeatureRanker, Neighbor, Ranking, elbow_point};
pub use types::{
    CellFailure, CellImputation, ColumnReport, ImputationOutcome, ImputationReport,
    ImputationStrategy,
};
