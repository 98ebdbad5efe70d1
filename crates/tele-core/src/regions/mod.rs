//! Region segmentation of the teleconnectivity field.
//!
//! Pipeline: threshold/significance filter → seed at the strongest unmarked
//! local maximum → significance-gated flood fill from the seed → repeat →
//! link discovery at local maxima. Runs either in one batch call
//! (`RegionSearch::find_regions`) or one state at a time (`RegionSearch::step`).

pub mod connectivity;
pub mod search;
pub mod stepper;

pub use connectivity::{Link, RegionConnectivity};
pub use search::{RegionSearch, RegionSearchResult};
pub use stepper::{SearchProgress, SearchState, StepOutcome};

use crate::grid::PointId;

/// Region label of a grid point.
pub type RegionLabel = i32;

/// Not yet visited by the search. Never present once a search completes.
pub const UNCLASSIFIED: RegionLabel = -1;
/// Below threshold or not significant.
pub const EXCLUDED: RegionLabel = 0;
/// First id handed out to a grown region.
pub const FIRST_REGION: RegionLabel = 1;

/// What the search needs to know about correlations, supplied by whoever
/// owns the correlation matrix and significance mask.
pub trait RegionHelper {
    /// Whether longitudes wrap around the grid edge.
    fn looped(&self) -> bool;

    fn correlation_value(&self, a: PointId, b: PointId) -> f32;

    /// Whether the correlation between `a` and `b` is statistically significant.
    fn correlation_significant(&self, a: PointId, b: PointId) -> bool;

    /// Whether the teleconnectivity of `point` is statistically significant.
    fn teleconnectivity_significant(&self, point: PointId) -> bool;
}
