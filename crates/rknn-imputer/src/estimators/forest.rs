//! Random forest impurity importances.
//!
//! Trees are grown on bootstrap samples by variance reduction. Only the
//! impurity decrease credited to each split feature is kept; the trees
//! themselves are discarded once grown.

use super::{EstimatorError, ImportanceEstimator, check_training_set};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Mean decrease in impurity over a forest of regression trees.
#[derive(Debug, Clone)]
pub struct RandomForestImportance {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features tried per split (all when `None`)
    pub max_features: Option<usize>,
    /// Random seed
    pub seed: u64,
    importances: Option<Vec<f64>>,
}

impl Default for RandomForestImportance {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestImportance {
    /// Create a forest with the given number of trees.
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
            importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set features tried per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn grow(
        &self,
        tree: &TreeData<'_>,
        indices: &mut [usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut StdRng,
    ) {
        let n_samples = indices.len();
        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d);
        if should_stop {
            return;
        }

        let n_features = importances.len();
        let candidates: Vec<usize> = match self.max_features {
            Some(m) if m < n_features => {
                rand::seq::index::sample(rng, n_features, m).into_vec()
            }
            _ => (0..n_features).collect(),
        };

        let Some(split) = self.best_split(tree, indices, &candidates) else {
            return;
        };
        importances[split.feature] += split.gain;

        indices.sort_by(|&a, &b| {
            tree.x[a][split.feature].total_cmp(&tree.x[b][split.feature])
        });
        let left_len = indices
            .iter()
            .take_while(|&&i| tree.x[i][split.feature] <= split.threshold)
            .count();
        let (left, right) = indices.split_at_mut(left_len);

        self.grow(tree, left, depth + 1, importances, rng);
        self.grow(tree, right, depth + 1, importances, rng);
    }

    fn best_split(
        &self,
        tree: &TreeData<'_>,
        indices: &[usize],
        candidates: &[usize],
    ) -> Option<Split> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| tree.y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| tree.y[i] * tree.y[i]).sum();
        let parent_sse = sse(n, total_sum, total_sq);
        if parent_sse <= f64::EPSILON {
            return None;
        }

        let mut best: Option<Split> = None;
        let mut order = indices.to_vec();

        for &feature in candidates {
            order.sort_by(|&a, &b| tree.x[a][feature].total_cmp(&tree.x[b][feature]));

            // Accumulate left-side statistics incrementally
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let yi = tree.y[order[pos]];
                left_sum += yi;
                left_sq += yi * yi;

                let current = tree.x[order[pos]][feature];
                let next = tree.x[order[pos + 1]][feature];
                if next <= current {
                    continue;
                }
                let left_count = pos + 1;
                let right_count = n - left_count;
                if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                    continue;
                }

                let children = sse(left_count, left_sum, left_sq)
                    + sse(right_count, total_sum - left_sum, total_sq - left_sq);
                let gain = parent_sse - children;
                if gain > best.as_ref().map_or(f64::EPSILON, |b| b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: (current + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

struct TreeData<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Sum of squared errors around the mean.
#[inline]
fn sse(count: usize, sum: f64, sq_sum: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (sq_sum - sum * sum / count as f64).max(0.0)
}

fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
}

impl ImportanceEstimator for RandomForestImportance {
    fn fit(&mut self, predictors: &[Vec<f64>], target: &[f64]) -> Result<(), EstimatorError> {
        self.importances = None;
        let n_features = check_training_set(predictors, target)?;
        let n_samples = predictors.len();
        let tree = TreeData {
            x: predictors,
            y: target,
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut totals = vec![0.0; n_features];

        for _ in 0..self.n_estimators {
            let mut sample: Vec<usize> = (0..n_samples)
                .map(|_| rng.gen_range(0..n_samples))
                .collect();
            let mut tree_importances = vec![0.0; n_features];
            self.grow(&tree, &mut sample, 0, &mut tree_importances, &mut rng);

            normalize(&mut tree_importances);
            for (total, value) in totals.iter_mut().zip(&tree_importances) {
                *total += value;
            }
        }

        normalize(&mut totals);
        if let Some(index) = totals.iter().position(|v| !v.is_finite()) {
            return Err(EstimatorError::NonFiniteImportance { index });
        }
        self.importances = Some(totals);
        Ok(())
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.importances.as_deref()
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }
}
