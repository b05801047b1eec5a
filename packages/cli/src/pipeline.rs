//! Full pipeline orchestrator.
//!
//! `fetch_all` downloads every registered dataset for the configured
//! years; `run_analysis` executes the analysis stages in order:
//! project, grid, aggregate, diagnose, model, compare, and write
//! artifacts. Each stage fully materializes its table before the next
//! begins, and any failure is fatal to the run.

use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use std::time::Instant;

use geo::{Coord, MultiPolygon};
use indicatif::MultiProgress;
use riskgrid_analytics::compare::{capture_rates, residual_autocorrelation};
use riskgrid_analytics::cv::{cross_validate, summarize, CvConfig, CvOutcome, CvScheme};
use riskgrid_analytics::matrix::{self, FeatureSet};
use riskgrid_grid::{aggregate, features, Fishnet};
use riskgrid_models::{NamedBoundary, NormalizedPoint, RiskFactorKind, SpatialSignal};
use riskgrid_source::boundaries::{fetch_boundary, load_boundaries};
use riskgrid_source::normalize::load_points;
use riskgrid_source::progress::ProgressCallback as _;
use riskgrid_source::registry;
use riskgrid_source::socrata::fetch_socrata;
use riskgrid_source::source_def::BoundarySource;
use riskgrid_source::FetchOptions;
use riskgrid_spatial::crs::TransverseMercator;
use riskgrid_spatial::RegionIndex;
use riskgrid_stats::kde::quartic_density;
use riskgrid_stats::lisa::{cluster_distance, local_moran, LisaConfig};
use riskgrid_stats::weights::SpatialWeights;

use crate::config::RunConfig;
use crate::progress::IndicatifProgress;

/// Downloads every registered dataset for the configured years.
///
/// # Errors
///
/// Returns an error if any fetch fails or comes back empty.
pub async fn fetch_all(
    config: &RunConfig,
    limit: Option<u64>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn Error>> {
    let raw_dir = riskgrid_generate::raw_data_dir();
    let client = reqwest::Client::new();

    let point_sources = registry::point_sources();
    let boundary_sources = registry::boundary_sources();
    let target = registry::target_source();

    let total = boundary_sources.len() + point_sources.len() + 1;
    let bar = IndicatifProgress::steps_bar(multi, "Fetching datasets", total as u64);

    for source in &boundary_sources {
        bar.set_message(format!("Fetching {}", source.id));
        fetch_boundary(
            &client,
            source,
            &FetchOptions {
                year: None,
                limit: None,
                output_dir: raw_dir.clone(),
            },
        )
        .await?;
        bar.inc(1);
    }

    for source in &point_sources {
        bar.set_message(format!("Fetching {}", source.id));
        fetch_socrata(
            &client,
            source,
            &FetchOptions {
                year: Some(config.model_year),
                limit,
                output_dir: raw_dir.clone(),
            },
        )
        .await?;
        bar.inc(1);
    }

    // The comparison needs the following year of the target category.
    bar.set_message(format!("Fetching {} holdout year", target.id));
    fetch_socrata(
        &client,
        &target,
        &FetchOptions {
            year: Some(config.holdout_year),
            limit,
            output_dir: raw_dir.clone(),
        },
    )
    .await?;
    bar.inc(1);

    bar.finish(format!("Fetched {total} datasets into {}", raw_dir.display()));
    Ok(())
}

/// Runs the full analysis from previously fetched raw files.
///
/// # Errors
///
/// Returns an error if any stage fails; there is no partial output
/// contract.
#[allow(clippy::too_many_lines)]
pub fn run_analysis(config: &RunConfig) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let raw_dir = riskgrid_generate::raw_data_dir();
    let out_dir = riskgrid_generate::output_dir();
    let zone = TransverseMercator::illinois_east();

    // --- 1. Boundaries, projected ---
    let city = load_layer(&raw_dir, "city_boundary")?;
    let study_area = merge_polygons(&city, &zone);

    let logo_layer = load_layer(&raw_dir, &config.logo_layer)?;
    let regions: Vec<(String, MultiPolygon<f64>)> = logo_layer
        .iter()
        .map(|b| (b.name.clone(), zone.project_multipolygon(&b.polygon)))
        .collect();
    let region_index = RegionIndex::build(&regions);
    log::info!(
        "Loaded study boundary and {} '{}' regions",
        regions.len(),
        config.logo_layer
    );

    // --- 2. Point layers, projected ---
    let target = registry::target_source();
    let target_points = load_points(
        &raw_dir.join(target.output_filename(Some(config.model_year))),
        &target,
        Some(config.model_year),
    )?;
    let target_coords = project_points(&zone, &target_points);

    let holdout_points = load_points(
        &raw_dir.join(target.output_filename(Some(config.holdout_year))),
        &target,
        Some(config.holdout_year),
    )?;
    let holdout_coords = project_points(&zone, &holdout_points);

    let mut factor_coords: BTreeMap<RiskFactorKind, Vec<Coord<f64>>> = BTreeMap::new();
    for source in registry::point_sources() {
        let Some(kind) = source.kind.risk_factor() else {
            continue;
        };
        let points = load_points(
            &raw_dir.join(source.output_filename(Some(config.model_year))),
            &source,
            Some(config.model_year),
        )?;
        factor_coords.insert(kind, project_points(&zone, &points));
    }

    // --- 3. Fishnet and aggregation ---
    let fishnet = Fishnet::build(&study_area, config.cell_size_ft)?;
    let cell_index = fishnet.build_index()?;

    let event_counts = aggregate::count_per_cell(&fishnet, &cell_index, &target_coords);
    let holdout_counts = aggregate::count_per_cell(&fishnet, &cell_index, &holdout_coords);

    let mut factor_counts = BTreeMap::new();
    let mut factor_tuples = BTreeMap::new();
    for (kind, coords) in &factor_coords {
        factor_counts.insert(
            *kind,
            aggregate::count_per_cell(&fishnet, &cell_index, coords),
        );
        factor_tuples.insert(*kind, features::coord_tuples(coords));
    }

    let profiles = features::build_profiles(
        &fishnet,
        &event_counts,
        &factor_tuples,
        &factor_counts,
        &region_index,
        config.knn_k,
    )?;
    log::info!(
        "Aggregated {} target events onto {} cells",
        target_coords.len(),
        fishnet.len()
    );

    // --- 4. Spatial-dependence diagnostics ---
    let cell_polygons: Vec<geo::Polygon<f64>> =
        fishnet.cells().iter().map(|c| c.polygon.clone()).collect();
    let weights = SpatialWeights::queen(&cell_polygons);

    let event_values: Vec<f64> = profiles.iter().map(|p| f64::from(p.event_count)).collect();
    let lisa = local_moran(
        &event_values,
        &weights,
        &LisaConfig {
            permutations: config.permutations,
            seed: config.seed,
            significance: config.significance,
        },
    )?;

    let centroid_tuples = features::centroid_tuples(&fishnet);
    let cluster_distances = cluster_distance(&centroid_tuples, &lisa);

    let signals: Vec<SpatialSignal> = profiles
        .iter()
        .zip(lisa.iter().zip(&cluster_distances))
        .map(|(profile, (cell, &distance))| SpatialSignal {
            cell_id: profile.cell_id,
            local_i: cell.local_i,
            p_value: cell.p_value,
            significant: cell.significant,
            cluster_distance: distance,
        })
        .collect();

    // --- 5. Model and cross-validate ---
    let cv_config = CvConfig {
        folds: config.folds,
        seed: config.seed,
    };
    let mut outcomes: Vec<CvOutcome> = Vec::new();
    for &feature_set in FeatureSet::all() {
        let design = matrix::build(&profiles, &signals, feature_set)?;
        for scheme in [CvScheme::RandomKFold, CvScheme::LeaveOneNeighborhoodOut] {
            outcomes.push(cross_validate(&design, scheme, feature_set, &cv_config)?);
        }
    }
    let summaries: Vec<_> = outcomes.iter().map(summarize).collect();

    let mut residual_rows = Vec::new();
    for outcome in &outcomes {
        residual_rows.push(residual_autocorrelation(
            outcome,
            &weights,
            config.permutations,
            config.seed,
        )?);
    }

    // --- 6. Kernel-density baselines and holdout comparison ---
    let holdout_vector: Vec<u32> = fishnet
        .cells()
        .iter()
        .map(|c| holdout_counts.get(&c.id).copied().unwrap_or(0))
        .collect();
    let target_tuples = features::coord_tuples(&target_coords);

    let mut capture_rows = Vec::new();
    for &bandwidth in &config.kde_bandwidths_ft {
        let surface = quartic_density(&target_tuples, &centroid_tuples, bandwidth)?;
        capture_rows.extend(capture_rates(
            &format!("kde_{bandwidth:.0}ft"),
            &surface,
            &holdout_vector,
        )?);
    }
    for outcome in outcomes
        .iter()
        .filter(|o| o.feature_set == FeatureSet::Spatial)
    {
        let surface: Vec<f64> = outcome.predictions.iter().map(|p| p.predicted).collect();
        capture_rows.extend(capture_rates(
            &format!("model_{}", outcome.scheme),
            &surface,
            &holdout_vector,
        )?);
    }

    // --- 7. Artifacts ---
    riskgrid_generate::tables::write_cell_features(&out_dir, &profiles, &signals)?;
    riskgrid_generate::tables::write_predictions(&out_dir, &outcomes)?;
    riskgrid_generate::tables::write_mae_summary(&out_dir, &summaries)?;
    riskgrid_generate::tables::write_capture_comparison(&out_dir, &capture_rows)?;
    riskgrid_generate::tables::write_residual_moran(&out_dir, &residual_rows)?;
    riskgrid_generate::geo_out::write_fishnet(&out_dir, &fishnet, &profiles, &signals, &outcomes)?;

    let summary = riskgrid_generate::RunSummary {
        model_year: config.model_year,
        holdout_year: config.holdout_year,
        cell_size_ft: config.cell_size_ft,
        cell_count: fishnet.len(),
        event_total: event_counts.values().map(|&c| u64::from(c)).sum(),
        holdout_event_total: holdout_vector.iter().map(|&c| u64::from(c)).sum(),
        significant_cells: signals.iter().filter(|s| s.significant).count(),
        mae_summaries: summaries,
    };
    riskgrid_generate::write_run_summary(&out_dir, &summary)?;

    log::info!(
        "Analysis complete in {:.1}s; artifacts in {}",
        start.elapsed().as_secs_f64(),
        out_dir.display()
    );
    Ok(())
}

/// Loads one boundary layer from its raw file.
fn load_layer(raw_dir: &Path, id: &str) -> Result<Vec<NamedBoundary>, Box<dyn Error>> {
    let source = boundary_by_id(id)?;
    Ok(load_boundaries(
        &raw_dir.join(source.output_filename()),
        &source,
    )?)
}

/// Resolves a boundary source from the registry by id.
fn boundary_by_id(id: &str) -> Result<BoundarySource, Box<dyn Error>> {
    registry::boundary_sources()
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| {
            let known: Vec<String> = registry::boundary_sources()
                .iter()
                .map(|s| s.id.clone())
                .collect();
            format!("Unknown boundary layer '{id}'; known layers: {known:?}").into()
        })
}

/// Merges a layer's polygons into one projected study-area boundary.
fn merge_polygons(layer: &[NamedBoundary], zone: &TransverseMercator) -> MultiPolygon<f64> {
    let polygons = layer
        .iter()
        .flat_map(|b| zone.project_multipolygon(&b.polygon).0)
        .collect();
    MultiPolygon(polygons)
}

/// Projects normalized points into the planar CRS.
fn project_points(zone: &TransverseMercator, points: &[NormalizedPoint]) -> Vec<Coord<f64>> {
    points
        .iter()
        .map(|p| zone.project(p.longitude, p.latitude))
        .collect()
}
