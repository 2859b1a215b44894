//! Elbow cutoff on a sorted score sequence.
//!
//! The cutoff sits where the discrete second derivative of the scores has its
//! largest magnitude. The same primitive picks both how many predictor
//! features and how many neighbors are used.

use crate::error::{ImputationError, Result};
use tracing::debug;

/// Index of the elbow in `scores` (inclusive end of the selected prefix).
///
/// For every interior index `i` the curvature is
/// `|scores[i + 1] + scores[i - 1] - 2 * scores[i]|`; the first strict maximum
/// wins. When no interior index has positive curvature the sequence has no
/// kink and the last index is returned, keeping every candidate.
///
/// # Errors
///
/// [`ImputationError::DegenerateElbowInput`] when fewer than three scores are
/// given, since no interior index exists.
pub fn elbow_point(scores: &[f64]) -> Result<usize> {
    let n = scores.len();
    if n <= 2 {
        return Err(ImputationError::DegenerateElbowInput { len: n });
    }

    let mut best = 0.0;
    let mut point = None;
    for i in 1..n - 1 {
        let curvature = (scores[i + 1] + scores[i - 1] - 2.0 * scores[i]).abs();
        if curvature > best {
            best = curvature;
            point = Some(i);
        }
    }

    Ok(point.unwrap_or(n - 1))
}

/// Select the prefix of `labels` up to the elbow of `scores`.
///
/// Sequences shorter than three keep all labels.
///
/// # Errors
///
/// [`ImputationError::ShapeMismatch`] when `scores` and `labels` differ in length.
pub fn select<'a, T>(scores: &[f64], labels: &'a [T]) -> Result<&'a [T]> {
    if scores.len() != labels.len() {
        return Err(ImputationError::shape(
            format!("{} labels", scores.len()),
            format!("{} labels", labels.len()),
        ));
    }

    match elbow_point(scores) {
        Ok(point) => Ok(&labels[..=point]),
        Err(ImputationError::DegenerateElbowInput { len }) => {
            debug!("Elbow input has {} candidates, keeping all", len);
            Ok(labels)
        }
        Err(e) => Err(e),
    }
}
