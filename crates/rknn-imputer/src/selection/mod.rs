//! Selection primitives used by the imputer.
//!
//! - [`elbow`] - automatic cutoff on a sorted score sequence
//! - [`ranking`] - predictor ranking through a pluggable estimator
//! - [`neighbors`] - distance-sorted donor search

pub mod elbow;
pub mod neighbors;
pub mod ranking;

pub use elbow::{elbow_point, select};
pub use neighbors::{Neighbor, inverse_distances, nearest_donors};
pub use ranking::{FeatureRanker, Ranking};
