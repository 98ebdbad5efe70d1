//! Batch region search and its individual steps.
use std::collections::VecDeque;

use super::connectivity::{Link, RegionConnectivity};
use super::{RegionHelper, RegionLabel, EXCLUDED, FIRST_REGION, UNCLASSIFIED};
use crate::error::{TeleError, TeleResult};
use crate::grid::{GridTopology, PointId};
use crate::teleconnectivity::TeleconnectivityField;

/// Output of a completed region search.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSearchResult {
    /// One label per point: 0 for excluded points, ≥ 1 for region members.
    pub region_map: Vec<RegionLabel>,
    /// Region ids handed out, counting the reserved id 0.
    pub n_region_ids: usize,
    pub connectivity: RegionConnectivity,
}

impl RegionSearchResult {
    /// Number of grown regions (ids 1..n_region_ids).
    pub fn region_count(&self) -> usize {
        self.n_region_ids.saturating_sub(1)
    }

    pub fn region_of(&self, point: PointId) -> RegionLabel {
        self.region_map[point]
    }

    /// Number of points carrying `region`.
    pub fn region_size(&self, region: RegionLabel) -> usize {
        self.region_map.iter().filter(|&&r| r == region).count()
    }
}

/// Region search over a teleconnectivity field.
///
/// Borrows its inputs for the duration of the search. Without a helper no
/// significance gating is applied and longitudes do not wrap; with one,
/// wraparound follows `RegionHelper::looped`.
pub struct RegionSearch<'a> {
    topology: GridTopology,
    field: &'a TeleconnectivityField,
    threshold: f32,
    helper: Option<&'a dyn RegionHelper>,
}

impl<'a> RegionSearch<'a> {
    pub fn new(
        topology: GridTopology,
        field: &'a TeleconnectivityField,
        threshold: f32,
        helper: Option<&'a dyn RegionHelper>,
    ) -> TeleResult<Self> {
        let n_points = topology.n_points();
        for (what, actual) in [
            ("teleconnectivity field", field.values.len()),
            ("teleconnectivity partners", field.partners.len()),
        ] {
            if actual != n_points {
                return Err(TeleError::DimensionMismatch { what, expected: n_points, actual });
            }
        }
        if let Some(&point) = field.partners.iter().find(|&&p| p >= n_points) {
            return Err(TeleError::PointOutOfRange { point, n_points });
        }

        let looped = helper.is_some_and(|h| h.looped());
        Ok(Self {
            topology: topology.with_looped(looped),
            field,
            threshold,
            helper,
        })
    }

    /// Topology the search runs on, with the effective wraparound flag.
    pub fn topology(&self) -> GridTopology {
        self.topology
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn field(&self) -> &TeleconnectivityField {
        self.field
    }

    /// Fresh region map with the filter applied.
    pub fn prepare(&self) -> Vec<RegionLabel> {
        let mut region_map = vec![UNCLASSIFIED; self.topology.n_points()];
        self.filter(&mut region_map);
        region_map
    }

    /// Mark every point below threshold or with insignificant
    /// teleconnectivity as excluded. Other labels are left untouched.
    pub fn filter(&self, region_map: &mut [RegionLabel]) {
        for (p, label) in region_map.iter_mut().enumerate() {
            let value = self.field.values[p];
            let below = value.is_nan() || value < self.threshold;
            let insignificant = self
                .helper
                .is_some_and(|h| !h.teleconnectivity_significant(p));
            if below || insignificant {
                *label = EXCLUDED;
            }
        }
    }

    /// Unclassified local maximum with the highest teleconnectivity.
    ///
    /// Scans row-major; a later point must be strictly higher to win. Points
    /// can be left unclassified without any local maximum among them (a
    /// higher neighbour was excluded or refused them during growth); the
    /// highest of those is returned then, so every point ends up classified.
    pub fn find_maximal_unmarked_point(&self, region_map: &[RegionLabel]) -> Option<PointId> {
        let values = &self.field.values;
        let mut best_max: Option<PointId> = None;
        let mut best_max_value = f32::NEG_INFINITY;
        let mut best_any: Option<PointId> = None;
        let mut best_any_value = f32::NEG_INFINITY;
        for p in 0..self.topology.n_points() {
            if region_map[p] != UNCLASSIFIED {
                continue;
            }
            if best_any.is_none() || values[p] > best_any_value {
                best_any_value = values[p];
                best_any = Some(p);
            }
            if values[p] > best_max_value && self.topology.is_local_maximum(values, p) {
                best_max_value = values[p];
                best_max = Some(p);
            }
        }
        best_max.or(best_any)
    }

    /// Start the next region at the best unmarked point.
    ///
    /// On success the seed gets label `next_region`, the counter advances,
    /// and the seed is queued for growth.
    pub fn seed(
        &self,
        region_map: &mut [RegionLabel],
        next_region: &mut RegionLabel,
        queue: &mut VecDeque<PointId>,
    ) -> Option<PointId> {
        let point = self.find_maximal_unmarked_point(region_map)?;
        region_map[point] = *next_region;
        *next_region += 1;
        queue.push_back(point);
        log::debug!(
            "seeded region {} at point {point} (teleconnectivity {:.3})",
            region_map[point],
            self.field.values[point]
        );
        Some(point)
    }

    /// Give every unclassified neighbour of `point` that qualifies against
    /// `seed` the label of `point`, and queue it.
    ///
    /// A neighbour qualifies if it is non-negatively and significantly
    /// correlated with the seed. Without a helper every neighbour qualifies.
    pub fn process_point_neighbors(
        &self,
        point: PointId,
        seed: PointId,
        region_map: &mut [RegionLabel],
        queue: &mut VecDeque<PointId>,
    ) {
        let region = region_map[point];
        debug_assert!(region >= EXCLUDED, "growing from an unclassified point");

        for n in self.topology.neighbors(point) {
            if region_map[n] != UNCLASSIFIED {
                continue;
            }
            let qualifies = match self.helper {
                None => true,
                Some(h) => {
                    h.correlation_value(seed, n) >= 0.0 && h.correlation_significant(seed, n)
                }
            };
            if qualifies {
                region_map[n] = region;
                queue.push_back(n);
            }
        }
    }

    /// Flood fill until the queue is drained. The point at the front of the
    /// queue on entry is the seed every candidate is tested against.
    ///
    /// Returns the number of points added to the region.
    pub fn grow_region(
        &self,
        region_map: &mut [RegionLabel],
        queue: &mut VecDeque<PointId>,
    ) -> usize {
        let Some(&seed) = queue.front() else {
            return 0;
        };
        let mut added = 0;
        while let Some(point) = queue.pop_front() {
            let before = queue.len();
            self.process_point_neighbors(point, seed, region_map, queue);
            added += queue.len() - before;
        }
        added
    }

    /// Links between regions found at teleconnectivity local maxima.
    ///
    /// Each local maximum whose partner lies in a different region proposes
    /// a link weighted by its own teleconnectivity.
    pub fn discover_links(&self, region_map: &[RegionLabel]) -> RegionConnectivity {
        let values = &self.field.values;
        let mut connectivity = RegionConnectivity::new();
        for p in 0..self.topology.n_points() {
            if !self.topology.is_local_maximum(values, p) {
                continue;
            }
            let partner = self.field.partners[p];
            let (from, to) = (region_map[p], region_map[partner]);
            if from > EXCLUDED && to > EXCLUDED && from != to {
                connectivity.suggest_link(from, to, Link::new(p, partner, values[p]));
            }
        }
        connectivity
    }

    /// Run the whole search.
    pub fn find_regions(&self) -> RegionSearchResult {
        let mut region_map = self.prepare();
        let mut next_region = FIRST_REGION;
        let mut queue = VecDeque::new();

        while let Some(seed) = self.seed(&mut region_map, &mut next_region, &mut queue) {
            let added = self.grow_region(&mut region_map, &mut queue);
            log::debug!(
                "region {} grown from point {seed}: {} points",
                region_map[seed],
                added + 1
            );
        }

        let connectivity = self.discover_links(&region_map);
        log::info!(
            "region search at threshold {}: {} regions, {} links",
            self.threshold,
            next_region - FIRST_REGION,
            connectivity.len()
        );

        RegionSearchResult {
            region_map,
            n_region_ids: next_region as usize,
            connectivity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::correlation::CorrelationMatrix;

    fn field(values: Vec<f32>, partners: Vec<PointId>) -> TeleconnectivityField {
        TeleconnectivityField { values, partners }
    }

    fn row(n: usize) -> GridTopology {
        GridTopology::new(1, n, false).unwrap()
    }

    /// Helper backed by a correlation matrix, with every pair significant
    /// unless listed in `insignificant`.
    struct MatrixHelper {
        matrix: CorrelationMatrix,
        looped: bool,
        insignificant: Vec<(PointId, PointId)>,
        tc_insignificant: Vec<PointId>,
    }

    impl RegionHelper for MatrixHelper {
        fn looped(&self) -> bool {
            self.looped
        }
        fn correlation_value(&self, a: PointId, b: PointId) -> f32 {
            self.matrix.get(a, b)
        }
        fn correlation_significant(&self, a: PointId, b: PointId) -> bool {
            !self.insignificant.contains(&(a, b))
        }
        fn teleconnectivity_significant(&self, point: PointId) -> bool {
            !self.tc_insignificant.contains(&point)
        }
    }

    #[test]
    fn new_rejects_mismatched_field() {
        let f = field(vec![0.5; 3], vec![0; 3]);
        assert!(RegionSearch::new(row(4), &f, 0.4, None).is_err());
        let f = field(vec![0.5; 3], vec![0, 1, 3]);
        assert_eq!(
            RegionSearch::new(row(3), &f, 0.4, None).err(),
            Some(TeleError::PointOutOfRange { point: 3, n_points: 3 })
        );
    }

    #[test]
    fn filter_excludes_points_below_threshold() {
        let f = field(vec![0.2, 0.7, 0.1], vec![0; 3]);
        let rs = RegionSearch::new(row(3), &f, 0.5, None).unwrap();
        assert_eq!(rs.prepare(), vec![0, -1, 0]);
    }

    #[test]
    fn filter_excludes_insignificant_teleconnectivity() {
        let f = field(vec![0.9, 0.7, 0.8], vec![0; 3]);
        let helper = MatrixHelper {
            matrix: CorrelationMatrix::new(3, vec![1.0; 9]).unwrap(),
            looped: false,
            insignificant: vec![],
            tc_insignificant: vec![2],
        };
        let rs = RegionSearch::new(row(3), &f, 0.5, Some(&helper)).unwrap();
        assert_eq!(rs.prepare(), vec![-1, -1, 0]);
    }

    #[test]
    fn neighbors_of_center_all_join_without_helper() {
        let f = field(vec![0.5; 9], vec![0; 9]);
        let topo = GridTopology::new(3, 3, false).unwrap();
        let rs = RegionSearch::new(topo, &f, 0.0, None).unwrap();

        let mut map = vec![UNCLASSIFIED; 9];
        map[4] = 1;
        let mut q = VecDeque::new();
        rs.process_point_neighbors(4, 4, &mut map, &mut q);

        assert!(map.iter().all(|&r| r == 1));
        assert_eq!(q.len(), 8);
        assert!(!q.contains(&4));
    }

    #[test]
    fn marked_neighbors_keep_their_label() {
        let f = field(vec![0.5; 9], vec![0; 9]);
        let topo = GridTopology::new(3, 3, false).unwrap();
        let rs = RegionSearch::new(topo, &f, 0.0, None).unwrap();

        let mut map = vec![UNCLASSIFIED; 9];
        map[4] = 1;
        map[6] = 2; // (lat 2, lon 0)
        let mut q = VecDeque::new();
        rs.process_point_neighbors(4, 4, &mut map, &mut q);

        assert_eq!(map, vec![1, 1, 1, 1, 1, 1, 2, 1, 1]);
        assert_eq!(q.len(), 7);
    }

    #[test]
    fn single_point_grid_has_nothing_to_grow() {
        let f = field(vec![0.5], vec![0]);
        let rs = RegionSearch::new(row(1), &f, 0.0, None).unwrap();
        let mut map = vec![1];
        let mut q = VecDeque::new();
        rs.process_point_neighbors(0, 0, &mut map, &mut q);
        assert_eq!(map, vec![1]);
        assert!(q.is_empty());
    }

    #[test]
    fn growth_stops_at_other_regions_and_does_not_wrap_without_helper() {
        let f = field(vec![0.5; 5], vec![0; 5]);
        let rs = RegionSearch::new(row(5), &f, 0.0, None).unwrap();
        let mut map = vec![1, -1, -1, 2, -1];
        let mut q = VecDeque::from([0]);
        let added = rs.grow_region(&mut map, &mut q);

        assert!(q.is_empty());
        assert_eq!(added, 2);
        assert_eq!(map, vec![1, 1, 1, 2, -1], "point 4 is only reachable across the seam");
    }

    #[test]
    fn growth_wraps_when_helper_reports_looped() {
        let f = field(vec![0.5; 5], vec![0; 5]);
        let helper = MatrixHelper {
            matrix: CorrelationMatrix::new(5, vec![0.5; 25]).unwrap(),
            looped: true,
            insignificant: vec![],
            tc_insignificant: vec![],
        };
        let rs = RegionSearch::new(row(5), &f, 0.0, Some(&helper)).unwrap();
        assert!(rs.topology().looped());
        let mut map = vec![1, -1, -1, 2, -1];
        let mut q = VecDeque::from([0]);
        rs.grow_region(&mut map, &mut q);
        assert_eq!(map, vec![1, 1, 1, 2, 1]);
    }

    #[test]
    fn growth_requires_non_negative_significant_correlation_with_seed() {
        // Seed 0; point 2 is negatively correlated with the seed, point 4
        // insignificantly. Both stay unclassified.
        let mut data = vec![0.5f32; 36];
        data[2] = -0.3;
        data[2 * 6] = -0.3;
        let helper = MatrixHelper {
            matrix: CorrelationMatrix::new(6, data).unwrap(),
            looped: false,
            insignificant: vec![(0, 4)],
            tc_insignificant: vec![],
        };
        let topo = GridTopology::new(2, 3, false).unwrap();
        let f = field(vec![0.5; 6], vec![0; 6]);
        let rs = RegionSearch::new(topo, &f, 0.0, Some(&helper)).unwrap();

        let mut map = vec![1, -1, -1, -1, -1, -1];
        let mut q = VecDeque::from([0]);
        rs.grow_region(&mut map, &mut q);
        // Points 1 and 3 join directly from the seed, 5 via 1.
        assert_eq!(map, vec![1, 1, -1, 1, -1, 1]);
    }

    #[test]
    fn maximal_unmarked_point_skips_marked_and_non_maxima() {
        let f = field(vec![0.6, 0.8, 0.7, 0.8, 0.2], vec![0; 5]);
        let rs = RegionSearch::new(row(5), &f, 0.0, None).unwrap();
        assert_eq!(rs.find_maximal_unmarked_point(&[-1, 0, -1, -1, -1]), Some(3));
        assert_eq!(rs.find_maximal_unmarked_point(&[-1, -1, -1, -1, -1]), Some(1));
        assert_eq!(rs.find_maximal_unmarked_point(&[0, 1, 0, 2, 0]), None);
    }

    #[test]
    fn stranded_points_seed_their_own_region() {
        // Point 0 is excluded but dominates 1, which dominates 2: no local
        // maximum is left among the unclassified points.
        let f = field(vec![0.9, 0.5, 0.3], vec![2, 2, 0]);
        let helper = MatrixHelper {
            matrix: CorrelationMatrix::new(3, vec![0.5; 9]).unwrap(),
            looped: false,
            insignificant: vec![],
            tc_insignificant: vec![0],
        };
        let rs = RegionSearch::new(row(3), &f, 0.0, Some(&helper)).unwrap();
        assert_eq!(rs.find_maximal_unmarked_point(&[0, -1, -1]), Some(1));

        let result = rs.find_regions();
        assert_eq!(result.region_map, vec![0, 1, 1]);
        assert_eq!(result.n_region_ids, 2);
    }

    #[test]
    fn seed_marks_point_and_advances_counter() {
        let f = field(vec![0.6, 0.8, 0.7, 0.2], vec![0; 4]);
        let rs = RegionSearch::new(row(4), &f, 0.0, None).unwrap();
        let mut map = vec![UNCLASSIFIED; 4];
        let mut next = FIRST_REGION;
        let mut q = VecDeque::new();

        assert_eq!(rs.seed(&mut map, &mut next, &mut q), Some(1));
        assert_eq!(q, VecDeque::from([1]));
        assert_eq!(map[1], 1);
        assert_eq!(next, 2);
    }

    #[test]
    fn find_regions_on_a_single_row() {
        let f = field(vec![0.7, 0.85, 0.2, 0.85, 0.15, 0.8], vec![3, 3, 1, 1, 1, 3]);
        let rs = RegionSearch::new(row(6), &f, 0.4, None).unwrap();
        let result = rs.find_regions();

        assert_eq!(result.region_map, vec![1, 1, 0, 2, 0, 3]);
        assert_eq!(result.n_region_ids, 4);
        assert_eq!(result.region_count(), 3);
        assert_eq!(result.region_size(1), 2);

        let link = result.connectivity.get_link(1, 2).expect("link 1 -> 2");
        assert_eq!((link.from, link.to), (1, 3));
        assert_relative_eq!(link.weight, 0.85);

        let link = result.connectivity.get_link(3, 2).expect("link 3 -> 2");
        assert_eq!((link.from, link.to), (5, 3));
        assert_relative_eq!(link.weight, 0.8);

        let link = result.connectivity.get_link(2, 1).expect("link 2 -> 1");
        assert_eq!((link.from, link.to), (3, 1));
    }

    #[test]
    fn nothing_above_threshold_yields_all_excluded() {
        let f = field(vec![0.1, 0.2, 0.3], vec![2, 2, 0]);
        let rs = RegionSearch::new(row(3), &f, 0.5, None).unwrap();
        let result = rs.find_regions();
        assert_eq!(result.region_map, vec![0, 0, 0]);
        assert_eq!(result.region_count(), 0);
        assert!(result.connectivity.is_empty());
    }

    #[test]
    fn search_classifies_every_point_and_excludes_exactly_the_filtered_set() {
        use crate::teleconnectivity::compute_teleconnectivity;
        use crate::test_support::random_matrix;

        let topo = GridTopology::new(6, 8, true).unwrap();
        let matrix = random_matrix(48, 11);
        let f = compute_teleconnectivity(&matrix);
        let helper = MatrixHelper {
            matrix: matrix.clone(),
            looped: true,
            insignificant: vec![],
            tc_insignificant: vec![5, 17, 30],
        };
        let rs = RegionSearch::new(topo, &f, 0.6, Some(&helper)).unwrap();
        let result = rs.find_regions();

        for (p, &r) in result.region_map.iter().enumerate() {
            assert_ne!(r, UNCLASSIFIED, "point {p} left unclassified");
            let filtered = f.values[p] < 0.6 || helper.tc_insignificant.contains(&p);
            assert_eq!(r == EXCLUDED, filtered, "point {p}: region {r}");
            assert!(r < result.n_region_ids as RegionLabel);
        }
        for (from, to, link) in result.connectivity.iter() {
            assert_eq!(result.region_of(link.from), from);
            assert_eq!(result.region_of(link.to), to);
            assert!(link.weight >= 0.0);
        }
    }
}
