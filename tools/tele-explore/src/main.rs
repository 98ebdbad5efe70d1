/// Exploration tool: loads a correlation dataset, runs the teleconnection
/// pipeline and writes a JSON report.
///
/// Dataset layout (JSON):
///   { "grid": { "lons": [..], "lats": [..] },
///     "n_time": 480,
///     "correlations": [[..], ..],   // one row per grid point, row-major ids
///     "autocorrelations": [..] }
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tele_core::regions::{SearchProgress, StepOutcome};
use tele_core::{
    CorrelationMatrix, ExplorationConfig, ExplorationModel, MapGrid, PointId, RegionLabel,
};
use tracing_subscriber::EnvFilter;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "tele-explore",
    about = "Find teleconnection regions, links and correlation chains in a correlation dataset"
)]
struct Args {
    /// Dataset JSON (grid axes, series length, correlation rows, autocorrelations)
    #[arg(short, long)]
    input: PathBuf,

    /// Exploration config JSON; missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the teleconnectivity threshold
    #[arg(long)]
    threshold: Option<f32>,

    /// Override the significance level of the teleconnectivity mask
    #[arg(long)]
    significance_level: Option<f64>,

    /// Reference longitude (needs --reference-lat)
    #[arg(long, requires = "reference_lat", allow_negative_numbers = true)]
    reference_lon: Option<f32>,

    /// Reference latitude (needs --reference-lon)
    #[arg(long, requires = "reference_lon", allow_negative_numbers = true)]
    reference_lat: Option<f32>,

    /// Log every step of the region search
    #[arg(long)]
    steps: bool,

    /// Report path (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug-level logging unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

// ── Dataset ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Dataset {
    grid: MapGrid,
    n_time: usize,
    correlations: Vec<Vec<f32>>,
    autocorrelations: Vec<f32>,
}

// ── Report ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Report {
    n_lat: usize,
    n_lon: usize,
    looped: bool,
    threshold: f32,
    significance_level: f64,
    significant_points: usize,
    region_count: usize,
    n_region_ids: usize,
    region_map: Vec<RegionLabel>,
    links: Vec<LinkOut>,
    reference_point: PointOut,
    chain: Vec<PointOut>,
    chain_links: Vec<(PointId, PointId)>,
}

#[derive(Serialize)]
struct LinkOut {
    from_region: RegionLabel,
    to_region: RegionLabel,
    from: PointOut,
    to: PointOut,
    weight: f32,
}

#[derive(Serialize)]
struct PointOut {
    id: PointId,
    lon: f32,
    lat: f32,
}

fn point_out(grid: &MapGrid, id: PointId) -> PointOut {
    let (lon, lat) = grid.coordinates(id).unwrap_or((f32::NAN, f32::NAN));
    PointOut { id, lon, lat }
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

fn load_config(args: &Args) -> Result<ExplorationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            ExplorationConfig::from_json_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ExplorationConfig::default(),
    };
    if let Some(t) = args.threshold {
        config.threshold = t;
    }
    if let Some(level) = args.significance_level {
        config.significance_level = level;
    }
    Ok(config)
}

fn load_model(args: &Args, config: ExplorationConfig) -> Result<ExplorationModel> {
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("Cannot read {}", args.input.display()))?;
    let dataset: Dataset = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse dataset {}", args.input.display()))?;
    if dataset.n_time < 3 {
        bail!("n_time must be at least 3, got {}", dataset.n_time);
    }

    let matrix = CorrelationMatrix::from_rows(dataset.correlations)?;
    let asymmetry = matrix.max_asymmetry();
    if asymmetry > 1e-4 {
        tracing::warn!(asymmetry, "correlation matrix is not symmetric");
    }
    tracing::info!(
        lons = dataset.grid.nlon(),
        lats = dataset.grid.nlat(),
        n_time = dataset.n_time,
        "dataset loaded"
    );
    Ok(ExplorationModel::new(
        dataset.grid,
        dataset.n_time,
        matrix,
        dataset.autocorrelations,
        config,
    )?)
}

/// Replay the region search one state at a time, logging each outcome.
fn trace_steps(model: &ExplorationModel) -> Result<()> {
    let search = model.region_search()?;
    let mut progress = SearchProgress::new();
    while !progress.is_finished() {
        match search.step(&mut progress) {
            StepOutcome::Prepared { excluded } => tracing::info!(excluded, "prepared"),
            StepOutcome::Seeded { region, seed, partner } => {
                tracing::info!(region, seed, partner, "seeded")
            }
            StepOutcome::Grown { region, added } => tracing::info!(region, added, "grown"),
            StepOutcome::Finished => tracing::info!(regions = progress.next_region - 1, "finished"),
        }
    }
    Ok(())
}

fn build_report(model: &ExplorationModel) -> Report {
    let grid = model.grid();
    let topology = model.topology();
    let regions = model.regions();

    let mut links: Vec<LinkOut> = regions
        .connectivity
        .iter()
        .map(|(from_region, to_region, link)| LinkOut {
            from_region,
            to_region,
            from: point_out(grid, link.from),
            to: point_out(grid, link.to),
            weight: link.weight,
        })
        .collect();
    links.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    Report {
        n_lat: topology.n_lat(),
        n_lon: topology.n_lon(),
        looped: topology.looped(),
        threshold: model.threshold(),
        significance_level: model.config().significance_level,
        significant_points: model
            .significance_mask()
            .map_or(0, |mask| mask.iter().filter(|&&s| s).count()),
        region_count: regions.region_count(),
        n_region_ids: regions.n_region_ids,
        region_map: regions.region_map.clone(),
        links,
        reference_point: point_out(grid, model.reference_point()),
        chain: model.chain().iter().map(|&p| point_out(grid, p)).collect(),
        chain_links: model.chain_links(),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    let mut model = load_model(&args, config)?;

    if let (Some(lon), Some(lat)) = (args.reference_lon, args.reference_lat) {
        let point = model.select_reference_point(lon, lat)?;
        tracing::info!(point, lon, lat, "reference point selected");
    }
    if args.steps {
        trace_steps(&model)?;
    }

    let report = build_report(&model);
    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Write failed: {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
