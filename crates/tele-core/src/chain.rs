//! Correlation chain: a greedy walk from a reference point through
//! successively most anti-correlated, not yet visited points.
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationMatrix;
use crate::error::{TeleError, TeleResult};
use crate::grid::PointId;

/// What the walk does once a step finds no new point.
///
/// Both policies return the same chain. A step that finds nothing leaves
/// the last point and the visited set unchanged, so every later step finds
/// nothing too. The policy only decides whether those empty steps are still
/// taken (and reported) or skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChainExhaustion {
    /// Keep counting empty steps until the length cap is reached, then warn
    /// about them.
    #[default]
    Idle,
    /// End the walk at the first empty step.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainOptions {
    /// The walk continues while the last correlation is below this value.
    pub threshold: f32,
    /// Upper bound on the chain length, reference included. At least 1.
    pub max_len: usize,
    pub exhaustion: ChainExhaustion,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            max_len: 100,
            exhaustion: ChainExhaustion::Idle,
        }
    }
}

/// Build the correlation chain starting at `reference`.
///
/// The walk starts from the correlation of `reference` with its
/// teleconnectivity partner and stops once the last correlation reaches
/// `options.threshold` or `options.max_len` steps have been taken. Each step
/// scans every point not yet in the chain in row-major order and takes the
/// first one with the lowest correlation to the last point, provided it is
/// below 1.0.
///
/// Fails when `options.max_len` is 0, when `reference` or its partner is
/// not a point of `matrix`, or when `partners` does not hold one entry per
/// point.
pub fn build_correlation_chain(
    reference: PointId,
    matrix: &CorrelationMatrix,
    partners: &[PointId],
    options: &ChainOptions,
) -> TeleResult<Vec<PointId>> {
    let n = matrix.n_points();
    if options.max_len == 0 {
        return Err(TeleError::InvalidChainLength);
    }
    if partners.len() != n {
        return Err(TeleError::DimensionMismatch {
            what: "teleconnectivity partners",
            expected: n,
            actual: partners.len(),
        });
    }
    if reference >= n {
        return Err(TeleError::PointOutOfRange { point: reference, n_points: n });
    }
    let partner = partners[reference];
    if partner >= n {
        return Err(TeleError::PointOutOfRange { point: partner, n_points: n });
    }

    let mut visited = vec![false; n];
    visited[reference] = true;

    let mut chain = vec![reference];
    let mut last = reference;
    let mut last_value = matrix.get(reference, partner);
    let mut steps = 1;
    let mut idle_steps = 0usize;

    while steps < options.max_len && last_value < options.threshold {
        let mut min_corr = 1.0f32;
        let mut min_point = last;
        for (p, &c) in matrix.row(last).iter().enumerate() {
            if !visited[p] && c < min_corr {
                min_corr = c;
                min_point = p;
            }
        }

        if min_point != last {
            visited[min_point] = true;
            chain.push(min_point);
            last = min_point;
            last_value = min_corr;
        } else {
            match options.exhaustion {
                ChainExhaustion::Idle => idle_steps += 1,
                ChainExhaustion::Stop => break,
            }
        }
        steps += 1;
    }

    if idle_steps > 0 {
        log::warn!(
            "correlation chain from point {reference} found no new point in {idle_steps} steps"
        );
    }
    log::info!(
        "correlation chain from point {reference}: {} points, last correlation {last_value}",
        chain.len()
    );
    Ok(chain)
}

/// Pairs of chain points as drawn on a map: the reference to the second
/// point, then every even-indexed point to its predecessor and successor.
pub fn chain_links(chain: &[PointId]) -> Vec<(PointId, PointId)> {
    let mut links = Vec::new();
    if chain.len() < 2 {
        return links;
    }
    links.push((chain[0], chain[1]));
    for j in (2..chain.len()).step_by(2) {
        links.push((chain[j], chain[j - 1]));
        if let Some(&next) = chain.get(j + 1) {
            links.push((chain[j], next));
        }
    }
    links
}
