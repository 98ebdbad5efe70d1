//! Teleconnection analysis on a regular longitude/latitude grid.
//!
//! Given all pairwise correlations between grid points and each point's
//! lag-1 autocorrelation, the crate derives the teleconnectivity field,
//! tests it for significance, segments it into regions of mutually
//! correlated points, links regions at their strongest anti-correlations,
//! and walks correlation chains from a reference point.
//!
//! `model::ExplorationModel` wires the stages together; each stage is also
//! usable on its own.

pub mod chain;
pub mod config;
pub mod correlation;
pub mod error;
pub mod grid;
pub mod model;
pub mod regions;
pub mod significance;
pub mod teleconnectivity;

#[cfg(test)]
mod test_support;

pub use chain::{build_correlation_chain, ChainExhaustion, ChainOptions};
pub use config::ExplorationConfig;
pub use correlation::CorrelationMatrix;
pub use error::{TeleError, TeleResult};
pub use grid::{GridTopology, MapGrid, PointId};
pub use model::ExplorationModel;
pub use regions::{RegionHelper, RegionLabel, RegionSearch, RegionSearchResult};
pub use significance::{SignificanceTest, Tail};
pub use teleconnectivity::{compute_teleconnectivity, TeleconnectivityField};
