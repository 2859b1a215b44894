//! Predictor ranking for a target feature.

use super::elbow;
use crate::error::Result;
use crate::estimators::{EstimatorError, EstimatorFactory};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Predictor features ordered by descending importance for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    /// Column being predicted
    pub target: usize,
    /// Predictor column indices, most important first
    pub features: Vec<usize>,
    /// Importance scores aligned with `features`
    pub scores: Vec<f64>,
}

impl Ranking {
    /// Elbow-trimmed prefix of the ranked features.
    pub fn select(&self) -> Result<Vec<usize>> {
        elbow::select(&self.scores, &self.features).map(<[usize]>::to_vec)
    }
}

type RankingKey = (usize, Vec<usize>);

/// Ranks predictors with a freshly built estimator per call.
///
/// With caching enabled, results (including failures) are remembered per
/// target and exclusion set. A ranker must only be used with one donor matrix.
pub struct FeatureRanker<'a> {
    factory: &'a dyn EstimatorFactory,
    cache: Option<HashMap<RankingKey, std::result::Result<Ranking, EstimatorError>>>,
    fits: usize,
    cache_hits: usize,
}

impl<'a> FeatureRanker<'a> {
    pub fn new(factory: &'a dyn EstimatorFactory) -> Self {
        Self {
            factory,
            cache: None,
            fits: 0,
            cache_hits: 0,
        }
    }

    /// Enable or disable result caching.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(HashMap::new);
        self
    }

    /// Number of estimator fits performed.
    pub fn fits(&self) -> usize {
        self.fits
    }

    /// Number of rankings served from the cache.
    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    /// Rank every column except `target` and `exclude` as a predictor of `target`.
    ///
    /// `donors` must be the complete-case rows in normalized scale. Equal
    /// scores keep ascending column order.
    pub fn rank(
        &mut self,
        donors: &[Vec<f64>],
        target: usize,
        exclude: &BTreeSet<usize>,
    ) -> std::result::Result<Ranking, EstimatorError> {
        let key: RankingKey = (
            target,
            exclude.iter().copied().filter(|&c| c != target).collect(),
        );

        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            self.cache_hits += 1;
            return cached.clone();
        }

        self.fits += 1;
        let ranking = rank_features(self.factory, donors, target, exclude);
        if let Some(cache) = self.cache.as_mut() {
            cache.insert(key, ranking.clone());
        }
        ranking
    }
}

fn rank_features(
    factory: &dyn EstimatorFactory,
    donors: &[Vec<f64>],
    target: usize,
    exclude: &BTreeSet<usize>,
) -> std::result::Result<Ranking, EstimatorError> {
    let n_cols = donors.first().map_or(0, Vec::len);
    let predictors: Vec<usize> = (0..n_cols)
        .filter(|&c| c != target && !exclude.contains(&c))
        .collect();
    if predictors.is_empty() {
        return Err(EstimatorError::EmptyPredictors);
    }

    let x: Vec<Vec<f64>> = donors
        .iter()
        .map(|row| predictors.iter().map(|&c| row[c]).collect())
        .collect();
    let y: Vec<f64> = donors.iter().map(|row| row[target]).collect();

    let mut estimator = factory.build();
    estimator.fit(&x, &y)?;
    let importances = estimator.feature_importances().ok_or_else(|| {
        EstimatorError::Other(format!("{} reported no importances", estimator.name()))
    })?;

    if importances.len() != predictors.len() {
        return Err(EstimatorError::ImportanceCount {
            expected: predictors.len(),
            actual: importances.len(),
        });
    }
    if let Some(index) = importances.iter().position(|s| !s.is_finite()) {
        return Err(EstimatorError::NonFiniteImportance { index });
    }

    let mut pairs: Vec<(usize, f64)> = predictors
        .into_iter()
        .zip(importances.iter().copied())
        .collect();
    // Stable sort: equal scores stay in ascending column order
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));

    debug!(
        "Ranked {} predictors for column {} with {}",
        pairs.len(),
        target,
        estimator.name()
    );

    let (features, scores) = pairs.into_iter().unzip();
    Ok(Ranking {
        target,
        features,
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::ImportanceEstimator;

    /// Scores each predictor with a fixed list, regardless of data.
    struct FixedScores {
        scores: Vec<f64>,
        fitted: Option<Vec<f64>>,
    }

    impl ImportanceEstimator for FixedScores {
        fn fit(
            &mut self,
            predictors: &[Vec<f64>],
            _target: &[f64],
        ) -> std::result::Result<(), EstimatorError> {
            let width = predictors[0].len();
            self.fitted = Some(self.scores.iter().copied().take(width).collect());
            Ok(())
        }

        fn feature_importances(&self) -> Option<&[f64]> {
            self.fitted.as_deref()
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn factory(scores: Vec<f64>) -> impl EstimatorFactory {
        move || {
            Box::new(FixedScores {
                scores: scores.clone(),
                fitted: None,
            }) as Box<dyn ImportanceEstimator>
        }
    }

    fn donors() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.1, 0.2, 0.3, 0.4],
            vec![1.0, 0.9, 0.8, 0.7, 0.6],
            vec![0.5, 0.5, 0.5, 0.5, 0.5],
        ]
    }

    #[test]
    fn test_rank_sorts_descending() {
        let factory = factory(vec![0.1, 0.7, 0.3, 0.5]);
        let mut ranker = FeatureRanker::new(&factory);
        let ranking = ranker.rank(&donors(), 0, &BTreeSet::new()).unwrap();

        assert_eq!(ranking.target, 0);
        assert_eq!(ranking.features, vec![2, 4, 3, 1]);
        assert_eq!(ranking.scores, vec![0.7, 0.5, 0.3, 0.1]);
    }

    #[test]
    fn test_rank_ties_keep_ascending_column_order() {
        let factory = factory(vec![0.5, 0.5, 0.9, 0.5]);
        let mut ranker = FeatureRanker::new(&factory);
        let ranking = ranker.rank(&donors(), 2, &BTreeSet::new()).unwrap();
        assert_eq!(ranking.features, vec![3, 0, 1, 4]);
    }

    #[test]
    fn test_rank_respects_exclusions() {
        let factory = factory(vec![0.2, 0.4, 0.6]);
        let mut ranker = FeatureRanker::new(&factory);
        let exclude = BTreeSet::from([3]);
        let ranking = ranker.rank(&donors(), 1, &exclude).unwrap();

        assert!(!ranking.features.contains(&1));
        assert!(!ranking.features.contains(&3));
        assert_eq!(ranking.features, vec![4, 2, 0]);
    }

    #[test]
    fn test_rank_everything_excluded() {
        let factory = factory(vec![]);
        let mut ranker = FeatureRanker::new(&factory);
        let exclude = BTreeSet::from([1, 2, 3, 4]);
        assert_eq!(
            ranker.rank(&donors(), 0, &exclude),
            Err(EstimatorError::EmptyPredictors)
        );
    }

    #[test]
    fn test_rank_detects_wrong_importance_count() {
        let factory = factory(vec![0.3, 0.2]);
        let mut ranker = FeatureRanker::new(&factory);
        assert_eq!(
            ranker.rank(&donors(), 0, &BTreeSet::new()),
            Err(EstimatorError::ImportanceCount {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn test_rank_rejects_non_finite_scores() {
        let factory = factory(vec![0.3, f64::NAN, 0.1, 0.2]);
        let mut ranker = FeatureRanker::new(&factory);
        assert_eq!(
            ranker.rank(&donors(), 0, &BTreeSet::new()),
            Err(EstimatorError::NonFiniteImportance { index: 1 })
        );
    }

    #[test]
    fn test_cache_reuses_identical_requests() {
        let factory = factory(vec![0.3, 0.2, 0.1, 0.05]);
        let mut ranker = FeatureRanker::new(&factory).with_cache(true);
        let exclude = BTreeSet::from([4]);

        let first = ranker.rank(&donors(), 0, &exclude).unwrap();
        let second = ranker.rank(&donors(), 0, &exclude).unwrap();
        let _other = ranker.rank(&donors(), 1, &exclude).unwrap();

        assert_eq!(first, second);
        assert_eq!(ranker.fits(), 2);
        assert_eq!(ranker.cache_hits(), 1);
    }

    #[test]
    fn test_without_cache_every_request_fits() {
        let factory = factory(vec![0.3, 0.2, 0.1, 0.05]);
        let mut ranker = FeatureRanker::new(&factory);
        ranker.rank(&donors(), 0, &BTreeSet::new()).unwrap();
        ranker.rank(&donors(), 0, &BTreeSet::new()).unwrap();
        assert_eq!(ranker.fits(), 2);
        assert_eq!(ranker.cache_hits(), 0);
    }

    #[test]
    fn test_ranking_select_applies_elbow() {
        let ranking = Ranking {
            target: 0,
            features: vec![3, 1, 2, 4],
            scores: vec![0.9, 0.1, 0.08, 0.06],
        };
        assert_eq!(ranking.select().unwrap(), vec![3, 1]);
    }
}
