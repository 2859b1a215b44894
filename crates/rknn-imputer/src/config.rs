//! Configuration types for the imputer.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic imputer setup.

use crate::error::ImputationError;
use crate::estimators::EstimatorKind;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// What to do when a query row coincides with a donor while the neighbor
/// count is chosen automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDistancePolicy {
    /// Floor distances at `min_distance` before inverting them
    #[default]
    Cap,
    /// Use only the coincident donors
    ExactMatches,
    /// Fail with a zero-distance collision error
    Reject,
}

/// What to do when the importance estimator cannot be fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole run with the estimator error
    Abort,
    /// Leave the affected cells missing and report them
    Skip,
    /// Fill the affected cells with the complete-case mean and report them
    #[default]
    CompleteCaseMean,
}

/// Configuration for the ranked nearest-neighbor imputer.
///
/// Use [`ImputerConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use rknn_imputer::config::{ImputerConfig, FailurePolicy};
///
/// let config = ImputerConfig::builder()
///     .k(3)
///     .on_estimator_failure(FailurePolicy::Abort)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputerConfig {
    /// Number of donors averaged per missing cell.
    /// `None` picks the count per cell with the elbow method, `Some(1)` is
    /// hot-deck, and values at or above the complete row count average
    /// every donor.
    /// Default: None
    pub k: Option<usize>,

    /// Importance estimator used to rank predictors.
    /// Default: MultiSurf
    pub estimator: EstimatorKind,

    /// Handling of donors at zero distance under automatic `k`.
    /// Default: Cap
    pub zero_distance_policy: ZeroDistancePolicy,

    /// Floor applied to distances before inversion.
    /// Default: 1e-9
    pub min_distance: f64,

    /// Handling of estimator fit failures.
    /// Default: CompleteCaseMean
    pub on_estimator_failure: FailurePolicy,

    /// Whether to reuse rankings for repeated (target, exclusion) pairs
    /// within one run.
    /// Default: true
    pub cache_rankings: bool,
}

impl Default for ImputerConfig {
    fn default() -> Self {
        Self {
            k: None,
            estimator: EstimatorKind::default(),
            zero_distance_policy: ZeroDistancePolicy::default(),
            min_distance: 1e-9,
            on_estimator_failure: FailurePolicy::default(),
            cache_rankings: true,
        }
    }
}

impl ImputerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ImputerConfigBuilder {
        ImputerConfigBuilder::default()
    }

    /// Load a JSON configuration file. Absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let file = File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config
            .validate()
            .map_err(|e| ImputationError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.k == Some(0) {
            return Err(ConfigValidationError::InvalidNeighbors(0));
        }

        if !self.min_distance.is_finite() || self.min_distance <= 0.0 {
            return Err(ConfigValidationError::InvalidMinDistance(self.min_distance));
        }

        self.estimator
            .validate()
            .map_err(ConfigValidationError::InvalidEstimator)?;

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid neighbor count: {0} (must be at least 1, or unset for automatic)")]
    InvalidNeighbors(usize),

    #[error("Invalid minimum distance: {0} (must be finite and positive)")]
    InvalidMinDistance(f64),

    #[error("Invalid estimator: {0}")]
    InvalidEstimator(String),
}

/// Builder for [`ImputerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ImputerConfigBuilder {
    k: Option<usize>,
    estimator: Option<EstimatorKind>,
    zero_distance_policy: Option<ZeroDistancePolicy>,
    min_distance: Option<f64>,
    on_estimator_failure: Option<FailurePolicy>,
    cache_rankings: Option<bool>,
}

impl ImputerConfigBuilder {
    /// Use a fixed number of donors per missing cell.
    pub fn k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    /// Set the neighbor count, `None` for automatic selection.
    pub fn neighbors(mut self, k: Option<usize>) -> Self {
        self.k = k;
        self
    }

    /// Set the importance estimator.
    pub fn estimator(mut self, estimator: EstimatorKind) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Set how coincident donors are handled under automatic `k`.
    pub fn zero_distance_policy(mut self, policy: ZeroDistancePolicy) -> Self {
        self.zero_distance_policy = Some(policy);
        self
    }

    /// Set the distance floor used before inversion.
    pub fn min_distance(mut self, distance: f64) -> Self {
        self.min_distance = Some(distance);
        self
    }

    /// Set how estimator failures are handled.
    pub fn on_estimator_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_estimator_failure = Some(policy);
        self
    }

    /// Enable or disable ranking reuse within a run.
    pub fn cache_rankings(mut self, cache: bool) -> Self {
        self.cache_rankings = Some(cache);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ImputerConfig` or an error if validation fails.
    pub fn build(self) -> Result<ImputerConfig, ConfigValidationError> {
        let config = ImputerConfig {
            k: self.k,
            estimator: self.estimator.unwrap_or_default(),
            zero_distance_policy: self.zero_distance_policy.unwrap_or_default(),
            min_distance: self.min_distance.unwrap_or(1e-9),
            on_estimator_failure: self.on_estimator_failure.unwrap_or_default(),
            cache_rankings: self.cache_rankings.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ImputerConfig::default();
        assert_eq!(config.k, None);
        assert_eq!(config.estimator, EstimatorKind::MultiSurf);
        assert_eq!(config.zero_distance_policy, ZeroDistancePolicy::Cap);
        assert_eq!(config.on_estimator_failure, FailurePolicy::CompleteCaseMean);
        assert!(config.cache_rankings);
    }

    #[test]
    fn test_builder_defaults() {
        let config = ImputerConfig::builder().build().unwrap();
        assert_eq!(config, ImputerConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ImputerConfig::builder()
            .k(3)
            .estimator(EstimatorKind::relieff())
            .zero_distance_policy(ZeroDistancePolicy::ExactMatches)
            .on_estimator_failure(FailurePolicy::Skip)
            .cache_rankings(false)
            .build()
            .unwrap();

        assert_eq!(config.k, Some(3));
        assert_eq!(config.estimator, EstimatorKind::ReliefF { n_neighbors: 10 });
        assert_eq!(config.zero_distance_policy, ZeroDistancePolicy::ExactMatches);
        assert_eq!(config.on_estimator_failure, FailurePolicy::Skip);
        assert!(!config.cache_rankings);
    }

    #[test]
    fn test_validation_zero_neighbors() {
        let result = ImputerConfig::builder().k(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidNeighbors(0)
        ));
    }

    #[test]
    fn test_validation_min_distance() {
        let result = ImputerConfig::builder().min_distance(0.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidMinDistance(_)
        ));

        let result = ImputerConfig::builder().min_distance(f64::NAN).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_estimator() {
        let result = ImputerConfig::builder()
            .estimator(EstimatorKind::ReliefF { n_neighbors: 0 })
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidEstimator(_)
        ));
    }

    #[test]
    fn test_neighbors_none_clears_fixed_k() {
        let config = ImputerConfig::builder().k(4).neighbors(None).build().unwrap();
        assert_eq!(config.k, None);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "k": 2,
            "estimator": { "kind": "random_forest", "n_estimators": 25, "max_depth": 4,
                           "min_samples_leaf": 2, "max_features": null, "seed": 7 },
            "zero_distance_policy": "reject",
            "on_estimator_failure": "complete_case_mean"
        }"#;

        let config: ImputerConfig = serde_json::from_str(json).expect("Should deserialize");

        assert_eq!(config.k, Some(2));
        assert_eq!(
            config.estimator,
            EstimatorKind::RandomForest {
                n_estimators: 25,
                max_depth: Some(4),
                min_samples_leaf: 2,
                max_features: None,
                seed: 7
            }
        );
        assert_eq!(config.zero_distance_policy, ZeroDistancePolicy::Reject);
        assert_eq!(config.on_estimator_failure, FailurePolicy::CompleteCaseMean);
        // Missing fields fall back to defaults
        assert_eq!(config.min_distance, 1e-9);
        assert!(config.cache_rankings);
        assert!(config.validate().is_ok());
    }

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_config_from_json_file() {
        let config = ImputerConfig::from_json_file(fixture("imputer.json")).unwrap();
        assert_eq!(config.k, Some(3));
        assert_eq!(config.estimator, EstimatorKind::ReliefF { n_neighbors: 4 });
        assert_eq!(config.on_estimator_failure, FailurePolicy::Skip);
        assert_eq!(config.zero_distance_policy, ZeroDistancePolicy::Cap);
    }

    #[test]
    fn test_config_from_json_file_errors() {
        let err = ImputerConfig::from_json_file(fixture("does_not_exist.json")).unwrap_err();
        assert!(matches!(err, ImputationError::Io(_)));
        assert_eq!(err.error_code(), "IO_ERROR");

        let err = ImputerConfig::from_json_file(fixture("measurements.csv")).unwrap_err();
        assert!(matches!(err, ImputationError::Json(_)));
        assert_eq!(err.error_code(), "JSON_ERROR");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ImputerConfig::builder().k(5).build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: ImputerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
