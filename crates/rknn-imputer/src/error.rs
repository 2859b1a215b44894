//! Error types for ranked nearest-neighbor imputation.
//!
//! This module provides the error hierarchy using `thiserror`. Every failure
//! the imputer can report deliberately has its own variant so callers can
//! match on it instead of parsing messages.
//!
//! Errors are serializable as `{ code, message }` so they can be embedded in
//! JSON reports.

use crate::estimators::EstimatorError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the imputer.
#[derive(Error, Debug)]
pub enum ImputationError {
    /// The matrix has no missing markers, so there is nothing to impute.
    #[error("No missing values can be detected in the dataset")]
    NoMissingValues,

    /// The elbow cutoff needs at least three candidates.
    #[error("Elbow cutoff needs at least 3 candidates, got {len}")]
    DegenerateElbowInput { len: usize },

    /// A query row coincides exactly with a donor under automatic neighbor selection.
    #[error(
        "Row {row} coincides with donor row {donor} while imputing column {column} (zero distance)"
    )]
    ZeroDistanceCollision {
        row: usize,
        column: usize,
        donor: usize,
    },

    /// The importance estimator could not be fitted.
    #[error("Importance estimator failed for column {column}{}: {source}", row_suffix(.row))]
    EstimatorFitFailure {
        column: usize,
        row: Option<usize>,
        #[source]
        source: EstimatorError,
    },

    /// Every row holds at least one missing value, so no donors exist.
    #[error("No complete rows available to act as donors")]
    NoCompleteRows,

    /// Shapes of the inputs do not line up.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// A column cannot be read as numbers.
    #[error("Column '{column}' has non-numeric type {dtype}")]
    NonNumericColumn { column: String, dtype: String },

    /// An infinite value was found outside the missing marker.
    #[error("Non-finite value at row {row}, column {column}")]
    NonFiniteValue { row: usize, column: usize },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ImputationError>,
    },
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" (row {r})")).unwrap_or_default()
}

impl ImputationError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ImputationError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, suitable for reports and scripting.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoMissingValues => "NO_MISSING_VALUES",
            Self::DegenerateElbowInput { .. } => "DEGENERATE_ELBOW_INPUT",
            Self::ZeroDistanceCollision { .. } => "ZERO_DISTANCE_COLLISION",
            Self::EstimatorFitFailure { .. } => "ESTIMATOR_FIT_FAILURE",
            Self::NoCompleteRows => "NO_COMPLETE_ROWS",
            Self::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            Self::NonNumericColumn { .. } => "NON_NUMERIC_COLUMN",
            Self::NonFiniteValue { .. } => "NON_FINITE_VALUE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error came from the importance estimator.
    pub fn is_estimator_failure(&self) -> bool {
        match self {
            Self::EstimatorFitFailure { .. } => true,
            Self::WithContext { source, .. } => source.is_estimator_failure(),
            _ => false,
        }
    }

    pub(crate) fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ImputationError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ImputationError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for imputation operations.
pub type Result<T> = std::result::Result<T, ImputationError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ImputationError::Polars(e).with_context(context))
    }
}
