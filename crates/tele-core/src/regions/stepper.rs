//! Single-step driver for the region search.
//!
//! The caller owns a `SearchProgress` (state, region map, work queue and next
//! region id) and hands it to `RegionSearch::step` once per step. Running the
//! steps to `Finished` produces the same region map as `find_regions`.
use std::collections::VecDeque;

use super::search::{RegionSearch, RegionSearchResult};
use super::{RegionLabel, EXCLUDED, FIRST_REGION};
use crate::grid::PointId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Apply the threshold/significance filter.
    Prepare,
    /// Look for the next seed.
    FindSeed,
    /// Drain the queue of the region seeded last.
    GrowRegion,
    /// No seed left. Terminal.
    Finished,
}

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Prepared { excluded: usize },
    /// A new region was started at `seed`; `partner` is the seed's
    /// teleconnectivity partner.
    Seeded {
        region: RegionLabel,
        seed: PointId,
        partner: PointId,
    },
    /// The region grew by `added` points beyond its seed.
    Grown { region: RegionLabel, added: usize },
    Finished,
}

/// Caller-held state of a step-wise search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchProgress {
    pub state: SearchState,
    pub region_map: Vec<RegionLabel>,
    pub queue: VecDeque<PointId>,
    pub next_region: RegionLabel,
}

impl SearchProgress {
    pub fn new() -> Self {
        Self {
            state: SearchState::Prepare,
            region_map: Vec::new(),
            queue: VecDeque::new(),
            next_region: FIRST_REGION,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == SearchState::Finished
    }
}

impl Default for SearchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionSearch<'_> {
    /// Advance `progress` by one state.
    pub fn step(&self, progress: &mut SearchProgress) -> StepOutcome {
        match progress.state {
            SearchState::Prepare => {
                progress.region_map = self.prepare();
                progress.queue.clear();
                progress.next_region = FIRST_REGION;
                progress.state = SearchState::FindSeed;
                let excluded = progress.region_map.iter().filter(|&&r| r == EXCLUDED).count();
                StepOutcome::Prepared { excluded }
            }
            SearchState::FindSeed => {
                let seeded = self.seed(
                    &mut progress.region_map,
                    &mut progress.next_region,
                    &mut progress.queue,
                );
                match seeded {
                    Some(seed) => {
                        progress.state = SearchState::GrowRegion;
                        StepOutcome::Seeded {
                            region: progress.region_map[seed],
                            seed,
                            partner: self.field().partners[seed],
                        }
                    }
                    None => {
                        progress.state = SearchState::Finished;
                        log::info!(
                            "step-wise region search finished: {} regions",
                            progress.next_region - FIRST_REGION
                        );
                        StepOutcome::Finished
                    }
                }
            }
            SearchState::GrowRegion => {
                let region = progress.next_region - 1;
                let added = self.grow_region(&mut progress.region_map, &mut progress.queue);
                progress.state = SearchState::FindSeed;
                StepOutcome::Grown { region, added }
            }
            SearchState::Finished => StepOutcome::Finished,
        }
    }

    /// Step until `Finished` and collect the result, links included.
    pub fn run_to_completion(&self, progress: &mut SearchProgress) -> RegionSearchResult {
        while !progress.is_finished() {
            self.step(progress);
        }
        RegionSearchResult {
            region_map: progress.region_map.clone(),
            n_region_ids: progress.next_region as usize,
            connectivity: self.discover_links(&progress.region_map),
        }
    }
}
