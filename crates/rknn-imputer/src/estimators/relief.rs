//! Relief-family relevance filters for numeric targets.
//!
//! Both estimators use the RReliefF update: a feature gains weight when it
//! differs between neighbors whose targets also differ, and loses weight when
//! it differs between neighbors with similar targets. They only disagree on
//! how the neighborhood of an instance is chosen.

use super::{EstimatorError, ImportanceEstimator, check_training_set};

/// How the neighbors of an instance are picked.
#[derive(Debug, Clone, Copy)]
enum Neighborhood {
    /// The `k` closest instances.
    Nearest(usize),
    /// Every instance closer than `mean - std / 2` of the distance profile,
    /// or every other instance when they are all equidistant.
    AdaptiveRadius,
}

/// ReliefF with a fixed number of nearest neighbors per instance.
#[derive(Debug, Clone)]
pub struct ReliefF {
    n_neighbors: usize,
    importances: Option<Vec<f64>>,
}

impl ReliefF {
    /// Create a new ReliefF estimator with the given neighbor count.
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1), // Ensure at least 1 neighbor
            importances: None,
        }
    }
}

impl ImportanceEstimator for ReliefF {
    fn fit(&mut self, predictors: &[Vec<f64>], target: &[f64]) -> Result<(), EstimatorError> {
        self.importances = None;
        let weights = relief_weights(
            predictors,
            target,
            Neighborhood::Nearest(self.n_neighbors),
        )?;
        self.importances = Some(weights);
        Ok(())
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.importances.as_deref()
    }

    fn name(&self) -> &'static str {
        "relieff"
    }
}

/// MultiSURF: no neighbor count to tune, each instance uses a radius derived
/// from its own distance profile.
#[derive(Debug, Clone, Default)]
pub struct MultiSurf {
    importances: Option<Vec<f64>>,
}

impl MultiSurf {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImportanceEstimator for MultiSurf {
    fn fit(&mut self, predictors: &[Vec<f64>], target: &[f64]) -> Result<(), EstimatorError> {
        self.importances = None;
        let weights = relief_weights(predictors, target, Neighborhood::AdaptiveRadius)?;
        self.importances = Some(weights);
        Ok(())
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.importances.as_deref()
    }

    fn name(&self) -> &'static str {
        "multisurf"
    }
}

/// Span of each column, used to scale differences into [0, 1].
fn column_spans(predictors: &[Vec<f64>], n_features: usize) -> Vec<f64> {
    (0..n_features)
        .map(|j| {
            let (min, max) = predictors
                .iter()
                .map(|row| row[j])
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            max - min
        })
        .collect()
}

#[inline]
fn scaled_diff(a: f64, b: f64, span: f64) -> f64 {
    if span > 0.0 { (a - b).abs() / span } else { 0.0 }
}

fn relief_weights(
    predictors: &[Vec<f64>],
    target: &[f64],
    neighborhood: Neighborhood,
) -> Result<Vec<f64>, EstimatorError> {
    let n_features = check_training_set(predictors, target)?;
    let n_samples = predictors.len();

    let spans = column_spans(predictors, n_features);
    let (t_min, t_max) = target
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let target_span = t_max - t_min;
    if target_span <= 0.0 {
        return Err(EstimatorError::ConstantTarget);
    }

    // Manhattan distances over scaled differences
    let mut distances = vec![vec![0.0; n_samples]; n_samples];
    for i in 0..n_samples {
        for j in (i + 1)..n_samples {
            let d: f64 = (0..n_features)
                .map(|f| scaled_diff(predictors[i][f], predictors[j][f], spans[f]))
                .sum();
            distances[i][j] = d;
            distances[j][i] = d;
        }
    }

    let mut n_dc = 0.0;
    let mut n_da = vec![0.0; n_features];
    let mut n_dcda = vec![0.0; n_features];
    let mut contributing = 0usize;

    for i in 0..n_samples {
        let neighbors = neighbors_of(i, &distances[i], neighborhood);
        if neighbors.is_empty() {
            continue;
        }
        contributing += 1;
        let weight = 1.0 / neighbors.len() as f64;

        for &j in &neighbors {
            let diff_target = scaled_diff(target[i], target[j], target_span);
            n_dc += diff_target * weight;
            for f in 0..n_features {
                let diff_feature = scaled_diff(predictors[i][f], predictors[j][f], spans[f]);
                n_da[f] += diff_feature * weight;
                n_dcda[f] += diff_target * diff_feature * weight;
            }
        }
    }

    if contributing == 0 {
        return Err(EstimatorError::Other(
            "no instance found any neighbors".to_string(),
        ));
    }

    let m = contributing as f64;
    let weights = (0..n_features)
        .map(|f| {
            let relevant = if n_dc > 0.0 { n_dcda[f] / n_dc } else { 0.0 };
            let irrelevant = if m - n_dc > 0.0 {
                (n_da[f] - n_dcda[f]) / (m - n_dc)
            } else {
                0.0
            };
            relevant - irrelevant
        })
        .collect();

    Ok(weights)
}

fn neighbors_of(i: usize, distances: &[f64], neighborhood: Neighborhood) -> Vec<usize> {
    match neighborhood {
        Neighborhood::Nearest(k) => {
            let mut others: Vec<usize> = (0..distances.len()).filter(|&j| j != i).collect();
            // Stable sort keeps lower indices first among equal distances
            others.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));
            others.truncate(k);
            others
        }
        Neighborhood::AdaptiveRadius => {
            let others: Vec<f64> = distances
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &d)| d)
                .collect();
            let n = others.len() as f64;
            let mean = others.iter().sum::<f64>() / n;
            let std = (others.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n).sqrt();
            if std == 0.0 {
                return (0..distances.len()).filter(|&j| j != i).collect();
            }
            let radius = mean - std / 2.0;

            (0..distances.len())
                .filter(|&j| j != i && distances[j] < radius)
                .collect()
        }
    }
}
