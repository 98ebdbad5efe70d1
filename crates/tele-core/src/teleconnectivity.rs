//! Teleconnectivity: for each point, the strength of its most negative
//! correlation and the point it is reached with.
//!
//! Rows are scanned independently, so with the `threading` feature the scan
//! is split across rayon workers, each writing its own output slot.
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationMatrix;
use crate::grid::PointId;

/// Per-point teleconnectivity magnitude and partner, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeleconnectivityField {
    /// |min_j correlation[i][j]| for every point i.
    pub values: Vec<f32>,
    /// The j reaching that minimum.
    pub partners: Vec<PointId>,
}

impl TeleconnectivityField {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Point with the highest teleconnectivity (first in scan order), or 0.
    pub fn strongest_point(&self) -> PointId {
        let mut best = 0;
        let mut best_value = 0.0f32;
        for (i, &v) in self.values.iter().enumerate() {
            if v > best_value {
                best_value = v;
                best = i;
            }
        }
        best
    }
}

/// Compute the teleconnectivity field of a correlation matrix. O(n²).
pub fn compute_teleconnectivity(matrix: &CorrelationMatrix) -> TeleconnectivityField {
    let n = matrix.n_points();

    #[cfg(feature = "threading")]
    let (values, partners): (Vec<f32>, Vec<PointId>) = {
        use rayon::prelude::*;
        (0..n)
            .into_par_iter()
            .map(|i| strongest_anticorrelation(matrix.row(i), i))
            .unzip()
    };

    #[cfg(not(feature = "threading"))]
    let (values, partners): (Vec<f32>, Vec<PointId>) = (0..n)
        .map(|i| strongest_anticorrelation(matrix.row(i), i))
        .unzip();

    TeleconnectivityField { values, partners }
}

/// Minimum of `row` (first occurrence wins) as `(|min|, argmin)`.
///
/// The scan starts from the perfect-correlation sentinel 1.0 at the point
/// itself, so a row with no value below 1.0 pairs the point with itself.
fn strongest_anticorrelation(row: &[f32], point: PointId) -> (f32, PointId) {
    let mut min_corr = 1.0f32;
    let mut min_index = point;
    for (j, &c) in row.iter().enumerate() {
        if c < min_corr {
            min_corr = c;
            min_index = j;
        }
    }
    (min_corr.abs(), min_index)
}
