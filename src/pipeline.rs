//! The `compute()` entry point: wires the components together in the
//! dependency order of §2, checking cancellation at each stage boundary
//! and emitting progress events to an injectable sink.

use crate::access;
use crate::cancel::CancelToken;
use crate::coverage;
use crate::crs::CrsResolver;
use crate::error::{Result, SegError};
use crate::geojson;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::project::{ComputeDiagnostics, ComputeResult, ProjectConfig, RasterInputs, VectorInputs};
use crate::{assemble, grid, raster, viewshed};

/// Runs a single `compute()` invocation end to end. Fails fast on
/// config/data problems (§7 policy); a cancellation request observed at
/// any stage boundary returns `Err(SegError::Cancelled)` with no partial
/// segments.
pub fn compute(
    config: &ProjectConfig,
    raster_inputs: &RasterInputs,
    vector_inputs: &VectorInputs,
    progress: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<ComputeResult> {
    let polygon_wgs84 = config.validate_and_parse_polygon()?;
    check_cancelled(cancel)?;
    emit(progress, "config", 1.0);

    let crs = CrsResolver::resolve(&polygon_wgs84)?;
    let polygon_metric = crs.forward_polygon(&polygon_wgs84)?;
    check_cancelled(cancel)?;
    emit(progress, "crs", 1.0);

    let surface = raster::prepare(
        &raster_inputs.dem_path,
        raster_inputs.vegetation_path.as_deref(),
        &polygon_wgs84,
        &polygon_metric,
        &crs,
        config.max_vlos_m,
    )?;
    check_cancelled(cancel)?;
    emit(progress, "raster", 1.0);

    let candidates = grid::generate(&polygon_metric, config.grid_spacing_m);
    let candidates_generated = candidates.len();
    check_cancelled(cancel)?;
    emit(progress, "grid", 1.0);

    let roads = match &vector_inputs.roads_path {
        Some(path) => geojson::read_line_layer(path)?,
        None => Vec::new(),
    };
    let trails = match &vector_inputs.trails_path {
        Some(path) => geojson::read_line_layer(path)?,
        None => Vec::new(),
    };
    let classified = access::classify(
        &candidates,
        &roads,
        &trails,
        config.access_buffer_m,
        &config.access_set,
    );
    let candidates_retained = classified.len();
    check_cancelled(cancel)?;
    emit(progress, "access", 1.0);

    let viewsheds = viewshed::compute_all(
        &classified,
        &surface,
        config.drone_agl_m,
        config.max_vlos_m,
        cancel,
        |done, total| emit(progress, "viewshed", done as f64 / total.max(1) as f64),
    )?;
    emit(progress, "viewshed", 1.0);

    let total_cells = (surface.rows as usize) * (surface.cols as usize);
    let total_target_cells = surface.target_cell_count();
    let preferred_cells = config.preferred_segment_acres * 4046.8564224 / (surface.cell_size * surface.cell_size);
    let min_useful_cells = coverage::default_min_useful_cells(preferred_cells);

    let selections = coverage::select(&viewsheds, total_cells, preferred_cells, min_useful_cells);
    let candidates_selected = selections.len();
    check_cancelled(cancel)?;
    emit(progress, "coverage", 1.0);

    let segments = assemble::assemble_segments(&selections, &viewsheds, &surface, &polygon_metric, &crs)?;
    emit(progress, "assemble", 1.0);

    let cells_covered: usize = selections.iter().map(|s| s.new_cells.len()).sum();
    let cells_visible_union = cells_covered;
    let coverage_fraction = assemble::coverage_fraction(cells_covered, total_target_cells);

    Ok(ComputeResult {
        segments,
        coverage_fraction,
        epsg: crs.epsg(),
        diagnostics: ComputeDiagnostics {
            candidates_generated,
            candidates_retained,
            candidates_selected,
            cells_total: total_target_cells,
            cells_visible_union,
            cells_covered,
        },
    })
}

fn check_cancelled(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        cancel.acknowledge();
        return Err(SegError::Cancelled);
    }
    Ok(())
}

fn emit(progress: &dyn ProgressSink, stage: &str, fraction: f64) {
    progress.on_progress(ProgressEvent { stage, fraction });
}
