//! Exploration model: owns one dataset and keeps every derived product
//! (teleconnectivity, significance mask, regions, correlation chain and
//! region selection) consistent with the current parameters.

use crate::chain::{self, build_correlation_chain};
use crate::config::ExplorationConfig;
use crate::correlation::CorrelationMatrix;
use crate::error::{TeleError, TeleResult};
use crate::grid::{GridTopology, MapGrid, PointId};
use crate::regions::{
    Link, RegionConnectivity, RegionHelper, RegionSearch, RegionSearchResult, EXCLUDED,
    FIRST_REGION,
};
use crate::significance::{significance_mask, SignificanceTest, Tail};
use crate::teleconnectivity::{compute_teleconnectivity, TeleconnectivityField};

pub struct ExplorationModel {
    grid: MapGrid,
    topology: GridTopology,
    n_time: usize,
    correlations: CorrelationMatrix,
    autocorrelations: Vec<f32>,
    config: ExplorationConfig,
    /// Pairwise test used to gate region growth.
    pair_test: SignificanceTest,

    field: TeleconnectivityField,
    significance: Option<Vec<bool>>,
    regions: RegionSearchResult,
    reference: PointId,
    chain: Vec<PointId>,
    selection: Vec<bool>,
    n_selected: usize,
}

impl ExplorationModel {
    /// Build a model and run the whole pipeline once.
    ///
    /// `correlations` must cover every grid point and `autocorrelations`
    /// needs one lag-1 value per point. The reference point starts at the
    /// point with the highest teleconnectivity.
    pub fn new(
        grid: MapGrid,
        n_time: usize,
        correlations: CorrelationMatrix,
        autocorrelations: Vec<f32>,
        config: ExplorationConfig,
    ) -> TeleResult<Self> {
        config.validate()?;
        let topology = grid.topology()?;
        let n_points = topology.n_points();
        if correlations.n_points() != n_points {
            return Err(TeleError::DimensionMismatch {
                what: "correlation matrix rows",
                expected: n_points,
                actual: correlations.n_points(),
            });
        }
        if autocorrelations.len() != n_points {
            return Err(TeleError::DimensionMismatch {
                what: "autocorrelation vector",
                expected: n_points,
                actual: autocorrelations.len(),
            });
        }
        let pair_test =
            SignificanceTest::new(config.correlation_significance_level, Tail::OneTailed, n_time)?;

        let field = compute_teleconnectivity(&correlations);
        let reference = field.strongest_point();

        let mut model = Self {
            grid,
            topology,
            n_time,
            correlations,
            autocorrelations,
            pair_test,
            field,
            significance: None,
            regions: RegionSearchResult {
                region_map: vec![EXCLUDED; n_points],
                n_region_ids: FIRST_REGION as usize,
                connectivity: RegionConnectivity::new(),
            },
            reference,
            chain: vec![reference],
            selection: vec![false; n_points],
            n_selected: 0,
            config,
        };

        model.compute_significance_mask(model.config.significance_level)?;
        model.rebuild_chain()?;
        model.run_region_search()?;

        log::info!(
            "exploration model: {}×{} grid (looped: {}), {} time steps, reference point {}",
            model.topology.n_lat(),
            model.topology.n_lon(),
            model.topology.looped(),
            n_time,
            model.reference
        );
        Ok(model)
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn grid(&self) -> &MapGrid {
        &self.grid
    }

    pub fn topology(&self) -> GridTopology {
        self.topology
    }

    pub fn n_time(&self) -> usize {
        self.n_time
    }

    pub fn correlations(&self) -> &CorrelationMatrix {
        &self.correlations
    }

    pub fn autocorrelations(&self) -> &[f32] {
        &self.autocorrelations
    }

    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    pub fn teleconnectivity(&self) -> &TeleconnectivityField {
        &self.field
    }

    pub fn regions(&self) -> &RegionSearchResult {
        &self.regions
    }

    pub fn reference_point(&self) -> PointId {
        self.reference
    }

    pub fn chain(&self) -> &[PointId] {
        &self.chain
    }

    // ── Significance ──────────────────────────────────────────────────────────

    /// Recompute the teleconnectivity significance mask at `level`.
    ///
    /// Regions are not recomputed; call `set_threshold` to refresh them.
    pub fn compute_significance_mask(&mut self, level: f64) -> TeleResult<()> {
        let test = SignificanceTest::new(level, self.config.tail, self.n_time)?;
        self.significance = Some(significance_mask(&test, &self.field, &self.autocorrelations)?);
        self.config.significance_level = level;
        Ok(())
    }

    pub fn significance_mask(&self) -> Option<&[bool]> {
        self.significance.as_deref()
    }

    /// Significance of the teleconnectivity at `point`; true without a mask.
    pub fn teleconnectivity_significant(&self, point: PointId) -> bool {
        self.significance
            .as_ref()
            .and_then(|mask| mask.get(point).copied())
            .unwrap_or(true)
    }

    /// One-tailed test of `correlation(a, b)` against the serial dependence of `a`.
    pub fn correlation_significant(&self, a: PointId, b: PointId) -> bool {
        self.pair_test
            .is_significant(self.correlations.get(a, b), self.autocorrelations[a])
    }

    // ── Regions ───────────────────────────────────────────────────────────────

    /// Change the teleconnectivity threshold and recompute the regions.
    ///
    /// The correlation chain is left as is.
    pub fn set_threshold(&mut self, threshold: f32) -> TeleResult<()> {
        if !threshold.is_finite() {
            return Err(TeleError::Config(format!("threshold must be finite, got {threshold}")));
        }
        self.config.threshold = threshold;
        self.run_region_search()
    }

    /// Region search over this model at the current threshold, with the
    /// model as helper. Use it to step through the segmentation.
    pub fn region_search(&self) -> TeleResult<RegionSearch<'_>> {
        RegionSearch::new(
            self.topology,
            &self.field,
            self.config.threshold,
            Some(self as &dyn RegionHelper),
        )
    }

    fn run_region_search(&mut self) -> TeleResult<()> {
        let result = self.region_search()?.find_regions();
        self.regions = result;
        Ok(())
    }

    /// Region links, heaviest first.
    pub fn teleconnectivity_links(&self) -> Vec<Link> {
        self.regions.connectivity.links_by_weight()
    }

    /// Select the region under `(lon, lat)`, or with `whole_component` every
    /// region linked to it. Returns the number of selected points.
    ///
    /// Points outside any region clear the selection.
    pub fn select_region_at(&mut self, lon: f32, lat: f32, whole_component: bool) -> usize {
        let region = self.regions.region_of(self.nearest(lon, lat));
        self.selection.fill(false);
        self.n_selected = 0;

        if self.regions.n_region_ids > 1 && region > EXCLUDED {
            let component = if whole_component {
                self.regions.connectivity.component(region)
            } else {
                [region].into()
            };
            for (selected, label) in self.selection.iter_mut().zip(&self.regions.region_map) {
                if component.contains(label) {
                    *selected = true;
                    self.n_selected += 1;
                }
            }
        }
        log::debug!("selected {} points around region {region}", self.n_selected);
        self.n_selected
    }

    pub fn reset_selection(&mut self) {
        self.selection.fill(false);
        self.n_selected = 0;
    }

    /// Per-point selection, or `None` when nothing is selected.
    pub fn selection_mask(&self) -> Option<&[bool]> {
        (self.n_selected > 0).then_some(self.selection.as_slice())
    }

    // ── Reference point and chain ─────────────────────────────────────────────

    /// Move the reference to the grid point nearest `(lon, lat)` and rebuild
    /// the chain. Returns the new reference point.
    pub fn select_reference_point(&mut self, lon: f32, lat: f32) -> TeleResult<PointId> {
        self.reference = self.nearest(lon, lat);
        self.rebuild_chain()?;
        Ok(self.reference)
    }

    pub fn select_reference_index(&mut self, point: PointId) -> TeleResult<()> {
        self.topology.check_point(point)?;
        self.reference = point;
        self.rebuild_chain()
    }

    fn rebuild_chain(&mut self) -> TeleResult<()> {
        self.chain = build_correlation_chain(
            self.reference,
            &self.correlations,
            &self.field.partners,
            &self.config.chain_options(),
        )?;
        Ok(())
    }

    /// Chain as point pairs to draw.
    pub fn chain_links(&self) -> Vec<(PointId, PointId)> {
        chain::chain_links(&self.chain)
    }

    // ── Point queries ─────────────────────────────────────────────────────────

    /// Correlation of the point nearest `(lon, lat)` with the reference point.
    pub fn correlation_at(&self, lon: f32, lat: f32) -> f32 {
        self.correlations.get(self.reference, self.nearest(lon, lat))
    }

    pub fn teleconnectivity_at(&self, lon: f32, lat: f32) -> f32 {
        self.field.values[self.nearest(lon, lat)]
    }

    /// Whether two coordinates fall on the same grid point.
    pub fn points_equal(&self, a: (f32, f32), b: (f32, f32)) -> bool {
        self.nearest(a.0, a.1) == self.nearest(b.0, b.1)
    }

    /// Grid point nearest `(lon, lat)`. The grid is never empty once the
    /// model is built.
    fn nearest(&self, lon: f32, lat: f32) -> PointId {
        self.grid.nearest_point(lon, lat).unwrap_or(0)
    }
}

impl RegionHelper for ExplorationModel {
    fn looped(&self) -> bool {
        self.topology.looped()
    }

    fn correlation_value(&self, a: PointId, b: PointId) -> f32 {
        self.correlations.get(a, b)
    }

    fn correlation_significant(&self, a: PointId, b: PointId) -> bool {
        ExplorationModel::correlation_significant(self, a, b)
    }

    fn teleconnectivity_significant(&self, point: PointId) -> bool {
        ExplorationModel::teleconnectivity_significant(self, point)
    }
}
