//! Pairwise correlation matrix over all grid points.
use serde::Serialize;

use crate::error::{TeleError, TeleResult};
use crate::grid::PointId;

/// Square matrix of correlations between the time series of every pair of
/// grid points, stored row-major as f32.
///
/// Row and column ids are grid point ids. The matrix is expected to be
/// symmetric with values in [-1, 1] and a unit diagonal; producing it is the
/// caller's responsibility.
///
/// Only `new` and `from_rows` build one, so the buffer always holds
/// `n_points²` values. Serializable for reports, not deserializable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    n_points: usize,
    data: Vec<f32>,
}

impl CorrelationMatrix {
    /// Wrap a row-major `n_points × n_points` buffer.
    pub fn new(n_points: usize, data: Vec<f32>) -> TeleResult<Self> {
        let expected = n_points * n_points;
        if data.len() != expected {
            return Err(TeleError::DimensionMismatch {
                what: "correlation matrix",
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { n_points, data })
    }

    /// Build from one vector per row. Every row must be as long as the row count.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> TeleResult<Self> {
        let n_points = rows.len();
        let mut data = Vec::with_capacity(n_points * n_points);
        for row in rows {
            if row.len() != n_points {
                return Err(TeleError::DimensionMismatch {
                    what: "correlation matrix row",
                    expected: n_points,
                    actual: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self { n_points, data })
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    #[inline]
    pub fn get(&self, a: PointId, b: PointId) -> f32 {
        self.data[a * self.n_points + b]
    }

    /// Correlations of `a` with every point.
    #[inline]
    pub fn row(&self, a: PointId) -> &[f32] {
        &self.data[a * self.n_points..(a + 1) * self.n_points]
    }

    /// Largest `|m[a][b] - m[b][a]|` over all pairs.
    pub fn max_asymmetry(&self) -> f32 {
        let mut worst = 0.0f32;
        for a in 0..self.n_points {
            for b in 0..a {
                worst = worst.max((self.get(a, b) - self.get(b, a)).abs());
            }
        }
        worst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_length() {
        let err = CorrelationMatrix::new(3, vec![1.0; 8]).unwrap_err();
        assert_eq!(
            err,
            TeleError::DimensionMismatch { what: "correlation matrix", expected: 9, actual: 8 }
        );
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let rows = vec![vec![1.0, -0.5], vec![-0.5]];
        assert!(CorrelationMatrix::from_rows(rows).is_err());
    }

    #[test]
    fn rows_and_cells_are_row_major() {
        let m = CorrelationMatrix::from_rows(vec![
            vec![1.0, -0.5, 0.2],
            vec![-0.5, 1.0, 0.1],
            vec![0.2, 0.1, 1.0],
        ])
        .unwrap();
        assert_eq!(m.n_points(), 3);
        assert_eq!(m.get(0, 1), -0.5);
        assert_eq!(m.row(2), &[0.2, 0.1, 1.0]);
        assert_eq!(m.max_asymmetry(), 0.0);
    }

    #[test]
    fn serialized_matrix_keeps_size_and_buffer_consistent() {
        let m = CorrelationMatrix::new(2, vec![1.0, -0.5, -0.5, 1.0]).unwrap();
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["n_points"], 2);
        assert_eq!(json["data"].as_array().map(Vec::len), Some(4), "n_points² values");

        // The only way back in is through the checked constructor.
        let data: Vec<f32> = serde_json::from_value(json["data"].clone()).unwrap();
        assert_eq!(CorrelationMatrix::new(2, data), Ok(m));
        assert!(CorrelationMatrix::new(3, vec![1.0; 4]).is_err(), "size and buffer must agree");
    }
}
