//! Reference coordinate grid and its point topology.
//!
//! Points are addressed by a single row-major id, `lat_index * n_lon + lon_index`,
//! exactly like cells of a heightfield. Coordinates are degrees stored as f32.
use serde::{Deserialize, Serialize};

use crate::error::{TeleError, TeleResult};

/// Row-major grid point id.
pub type PointId = usize;

/// Full longitude circle in degrees.
const LON_FULL_RANGE: f32 = 360.0;

// ── Coordinate grid ───────────────────────────────────────────────────────────

/// Longitude and latitude axes of the analysed dataset.
///
/// Coordinates are assumed to change monotonically along each axis with a
/// constant step between neighbouring cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapGrid {
    pub lons: Vec<f32>,
    pub lats: Vec<f32>,
}

impl MapGrid {
    pub fn new(lons: Vec<f32>, lats: Vec<f32>) -> Self {
        Self { lons, lats }
    }

    #[inline]
    pub fn nlon(&self) -> usize {
        self.lons.len()
    }

    #[inline]
    pub fn nlat(&self) -> usize {
        self.lats.len()
    }

    /// Longitude step between neighbouring cells; 0.0 with fewer than two longitudes.
    pub fn dx(&self) -> f32 {
        if self.nlon() < 2 {
            return 0.0;
        }
        self.lons[1] - self.lons[0]
    }

    /// Latitude step between neighbouring cells; 0.0 with fewer than two latitudes.
    pub fn dy(&self) -> f32 {
        if self.nlat() < 2 {
            return 0.0;
        }
        self.lats[1] - self.lats[0]
    }

    pub fn lon_min(&self) -> f32 {
        axis_bounds(&self.lons).0
    }

    pub fn lon_max(&self) -> f32 {
        axis_bounds(&self.lons).1
    }

    pub fn lat_min(&self) -> f32 {
        axis_bounds(&self.lats).0
    }

    pub fn lat_max(&self) -> f32 {
        axis_bounds(&self.lats).1
    }

    pub fn lon_range(&self) -> f32 {
        (self.dx() * self.nlon().saturating_sub(1) as f32).abs()
    }

    /// Whether the longitude axis wraps around the full circle.
    ///
    /// The outer cell borders (half a step beyond the first and last
    /// longitude) must span 360° up to a third of a cell. Needs at least
    /// three longitudes.
    pub fn looped_lon(&self) -> bool {
        let nlon = self.nlon();
        if nlon < 3 {
            return false;
        }
        let dx = self.dx();
        let border_left = self.lons[0] - dx / 2.0;
        let border_right = self.lons[nlon - 1] + dx / 2.0;
        ((border_right - border_left).abs() - LON_FULL_RANGE).abs() < dx.abs() / 3.0
    }

    /// Grid point closest to `(lon, lat)`, searching each axis independently.
    ///
    /// Ties resolve to the lower index. Returns `None` for an empty grid.
    pub fn nearest_point(&self, lon: f32, lat: f32) -> Option<PointId> {
        let lon_idx = nearest_index(&self.lons, lon)?;
        let lat_idx = nearest_index(&self.lats, lat)?;
        Some(lat_idx * self.nlon() + lon_idx)
    }

    /// `(lon, lat)` of a grid point, or `None` if the id is out of range.
    pub fn coordinates(&self, point: PointId) -> Option<(f32, f32)> {
        if self.nlon() == 0 || point >= self.nlon() * self.nlat() {
            return None;
        }
        Some((self.lons[point % self.nlon()], self.lats[point / self.nlon()]))
    }

    /// Point topology of this grid, looped if the longitudes wrap.
    pub fn topology(&self) -> TeleResult<GridTopology> {
        GridTopology::new(self.nlat(), self.nlon(), self.looped_lon())
    }
}

fn axis_bounds(axis: &[f32]) -> (f32, f32) {
    match (axis.first(), axis.last()) {
        (Some(&a), Some(&b)) => (a.min(b), a.max(b)),
        _ => (0.0, 0.0),
    }
}

fn nearest_index(axis: &[f32], value: f32) -> Option<usize> {
    let mut best = None;
    let mut best_diff = f32::INFINITY;
    for (i, &v) in axis.iter().enumerate() {
        let diff = (value - v).abs();
        if diff < best_diff {
            best_diff = diff;
            best = Some(i);
        }
    }
    best
}

// ── Topology ──────────────────────────────────────────────────────────────────

/// Axis lengths plus the longitude wraparound flag.
///
/// Built through `new` or `MapGrid::topology`, which reject empty axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridTopology {
    n_lat: usize,
    n_lon: usize,
    looped: bool,
}

impl GridTopology {
    pub fn new(n_lat: usize, n_lon: usize, looped: bool) -> TeleResult<Self> {
        if n_lat == 0 || n_lon == 0 {
            return Err(TeleError::EmptyGrid { n_lat, n_lon });
        }
        Ok(Self { n_lat, n_lon, looped })
    }

    /// Same axes with a different wraparound flag.
    pub fn with_looped(self, looped: bool) -> Self {
        Self { looped, ..self }
    }

    #[inline]
    pub fn n_lat(&self) -> usize {
        self.n_lat
    }

    #[inline]
    pub fn n_lon(&self) -> usize {
        self.n_lon
    }

    #[inline]
    pub fn looped(&self) -> bool {
        self.looped
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.n_lat * self.n_lon
    }

    #[inline]
    pub fn point_id(&self, lat: usize, lon: usize) -> PointId {
        lat * self.n_lon + lon
    }

    /// `(lat_index, lon_index)` of a point.
    #[inline]
    pub fn indices(&self, point: PointId) -> (usize, usize) {
        (point / self.n_lon, point % self.n_lon)
    }

    pub fn contains(&self, point: PointId) -> bool {
        point < self.n_points()
    }

    pub(crate) fn check_point(&self, point: PointId) -> TeleResult<()> {
        if self.contains(point) {
            Ok(())
        } else {
            Err(TeleError::PointOutOfRange { point, n_points: self.n_points() })
        }
    }

    /// The up-to-8 neighbours of `point`.
    ///
    /// Enumerated latitude offset -1..=1 (outer) then longitude offset -1..=1
    /// (inner). Longitudes wrap modulo `n_lon` on a looped grid and are
    /// dropped otherwise; latitudes never wrap. The point itself and repeated
    /// ids produced by wrapping on narrow grids are omitted.
    pub fn neighbors(&self, point: PointId) -> Vec<PointId> {
        let (lat, lon) = self.indices(point);
        let n_lat = self.n_lat as isize;
        let n_lon = self.n_lon as isize;

        let mut out = Vec::with_capacity(8);
        for di in -1isize..=1 {
            let nlat = lat as isize + di;
            if nlat < 0 || nlat >= n_lat {
                continue;
            }
            for dj in -1isize..=1 {
                if di == 0 && dj == 0 {
                    continue;
                }
                let mut nlon = lon as isize + dj;
                if self.looped {
                    nlon = nlon.rem_euclid(n_lon);
                }
                if nlon < 0 || nlon >= n_lon {
                    continue;
                }
                let id = self.point_id(nlat as usize, nlon as usize);
                if id != point && !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out
    }

    /// True if no neighbour of `point` holds a strictly greater value.
    ///
    /// `values` is a per-point field of length `n_points()`.
    pub fn is_local_maximum(&self, values: &[f32], point: PointId) -> bool {
        let v = values[point];
        self.neighbors(point).into_iter().all(|n| values[n] <= v)
    }
}
