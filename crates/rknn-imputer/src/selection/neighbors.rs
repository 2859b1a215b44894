//! Donor search in a selected feature subspace.

use crate::error::{ImputationError, Result};
use serde::Serialize;

/// A complete-case donor and its distance to the query row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    /// Position of the donor among the complete rows
    pub donor: usize,
    /// Euclidean distance in the selected subspace
    pub distance: f64,
}

/// Rank every donor by Euclidean distance to `query` over `features`.
///
/// `query` is a full normalized row (missing entries as `None`); only the
/// selected features are read and they must all be present. Donors at equal
/// distance keep their original order.
pub fn nearest_donors(
    query: &[Option<f64>],
    donors: &[Vec<f64>],
    features: &[usize],
) -> Result<Vec<Neighbor>> {
    let reduced: Vec<f64> = features
        .iter()
        .map(|&f| match query.get(f) {
            Some(Some(v)) => Ok(*v),
            Some(None) => Err(ImputationError::shape(
                format!("observed value in selected feature {f}"),
                "missing value",
            )),
            None => Err(ImputationError::shape(
                format!("feature index below {}", query.len()),
                format!("feature {f}"),
            )),
        })
        .collect::<Result<_>>()?;

    let mut neighbors: Vec<Neighbor> = donors
        .iter()
        .enumerate()
        .map(|(donor, row)| Neighbor {
            donor,
            distance: euclidean_distance(&reduced, row, features),
        })
        .collect();

    // Sort by distance (ascending); stable, so ties stay in donor order
    neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    Ok(neighbors)
}

/// Euclidean distance between a reduced query and the same features of a donor row.
fn euclidean_distance(reduced_query: &[f64], donor: &[f64], features: &[usize]) -> f64 {
    reduced_query
        .iter()
        .zip(features)
        .map(|(q, &f)| {
            let diff = q - donor[f];
            diff * diff
        })
        .sum::<f64>()
        .sqrt()
}

/// Inverse distances used as elbow scores, with distances floored at `min_distance`.
pub fn inverse_distances(neighbors: &[Neighbor], min_distance: f64) -> Vec<f64> {
    neighbors
        .iter()
        .map(|n| 1.0 / n.distance.max(min_distance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donors() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0, 9.0],
            vec![3.0, 4.0, 9.0],
            vec![1.0, 0.0, 9.0],
            vec![0.0, 1.0, 0.0],
        ]
    }

    #[test]
    fn test_nearest_donors_sorted_by_distance() {
        let query = [Some(0.0), Some(0.0), None];
        let neighbors = nearest_donors(&query, &donors(), &[0, 1]).unwrap();

        let order: Vec<usize> = neighbors.iter().map(|n| n.donor).collect();
        // Donors 2 and 3 tie at distance 1 and keep their order
        assert_eq!(order, vec![0, 2, 3, 1]);
        assert_eq!(neighbors[0].distance, 0.0);
        assert_eq!(neighbors[3].distance, 5.0);
    }

    #[test]
    fn test_nearest_donors_only_reads_selected_features() {
        let query = [Some(3.0), None, Some(100.0)];
        let neighbors = nearest_donors(&query, &donors(), &[0]).unwrap();
        assert_eq!(neighbors[0].donor, 1);
        assert_eq!(neighbors[0].distance, 0.0);
    }

    #[test]
    fn test_nearest_donors_rejects_missing_selected_feature() {
        let query = [Some(0.0), None, Some(1.0)];
        let result = nearest_donors(&query, &donors(), &[0, 1]);
        assert!(matches!(result, Err(ImputationError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_empty_feature_set_puts_everyone_at_zero() {
        let query = [None, None, None];
        let neighbors = nearest_donors(&query, &donors(), &[]).unwrap();
        assert!(neighbors.iter().all(|n| n.distance == 0.0));
        assert_eq!(neighbors.len(), 4);
    }

    #[test]
    fn test_inverse_distances_cap_zero_distance() {
        let neighbors = [
            Neighbor {
                donor: 0,
                distance: 0.0,
            },
            Neighbor {
                donor: 1,
                distance: 0.5,
            },
        ];
        let inverse = inverse_distances(&neighbors, 0.25);
        assert_eq!(inverse, vec![4.0, 2.0]);
        assert!(inverse.iter().all(|v| v.is_finite()));
    }
}
