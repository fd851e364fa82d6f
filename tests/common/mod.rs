//! Shared fixtures for the black-box scenario and property tests: builds a
//! synthetic in-process [`SurfaceRaster`] directly (skipping
//! `raster::prepare`'s GDAL file I/O) and runs the candidate-generation
//! through assembly stages of [`sarseg::pipeline::compute`] against it.
//!
//! Mirrors `pipeline::compute`'s body from the grid stage onward; the only
//! stage not exercised here is `raster::prepare` itself, which needs a real
//! GeoTIFF on disk and is covered separately by `raster.rs`'s own unit
//! tests.

use std::collections::BTreeSet;

use geo::{Coord, LineString, Polygon};

use sarseg::geometry::MetricBbox;
use sarseg::project::AccessMode;
use sarseg::raster::SurfaceRaster;
use sarseg::{access, assemble, coverage, crs::CrsResolver, grid, viewshed};
use sarseg::{CancelToken, ComputeDiagnostics, ComputeResult, Result};

/// A small axis-aligned WGS84 rectangle centered at `(center_lon,
/// center_lat)`. Kept near the equator in callers so degree-to-meter scale
/// stays close to 111km/degree on both axes, which is all these tests need
/// to reason about approximate sizes; exact geodesy is the CRS resolver's
/// job, not the fixture's.
pub fn wgs84_rect(center_lon: f64, center_lat: f64, half_width_deg: f64, half_height_deg: f64) -> Polygon<f64> {
    use geo::polygon;
    polygon![
        (x: center_lon - half_width_deg, y: center_lat - half_height_deg),
        (x: center_lon + half_width_deg, y: center_lat - half_height_deg),
        (x: center_lon + half_width_deg, y: center_lat + half_height_deg),
        (x: center_lon - half_width_deg, y: center_lat + half_height_deg),
        (x: center_lon - half_width_deg, y: center_lat - half_height_deg),
    ]
}

/// Resolves the metric CRS for `polygon_wgs84` and forward-projects it,
/// the same first two steps `pipeline::compute` performs.
pub fn resolve(polygon_wgs84: &Polygon<f64>) -> (CrsResolver, Polygon<f64>) {
    let crs = CrsResolver::resolve(polygon_wgs84).expect("resolve CRS");
    let metric = crs.forward_polygon(polygon_wgs84).expect("forward project");
    (crs, metric)
}

/// Builds a flat synthetic surface raster covering `polygon_metric`'s
/// bounding box inflated by `max_vlos_m` (matching `raster::prepare`'s own
/// clip margin), with every cell inside the polygon marked as target.
pub fn flat_surface(polygon_metric: &Polygon<f64>, max_vlos_m: f64, cell_size: f64, elevation: f32) -> SurfaceRaster {
    use geo::Contains;

    let bbox = MetricBbox::of_polygon(polygon_metric).inflate(max_vlos_m);
    let cols = (bbox.width() / cell_size).ceil().max(1.0) as u32;
    let rows = (bbox.height() / cell_size).ceil().max(1.0) as u32;
    let origin_x = bbox.min_x;
    let origin_y = bbox.max_y;
    let count = (rows as usize) * (cols as usize);

    let mut target_mask = vec![false; count];
    for row in 0..rows {
        for col in 0..cols {
            let (x, y) = sarseg::geometry::cell_center_to_world(row, col, origin_x, origin_y, cell_size);
            if polygon_metric.contains(&Coord { x, y }) {
                target_mask[row as usize * cols as usize + col as usize] = true;
            }
        }
    }

    SurfaceRaster {
        rows,
        cols,
        origin_x,
        origin_y,
        cell_size,
        ground: vec![elevation; count],
        surface: vec![elevation; count],
        target_mask,
    }
}

/// Raises ground and surface elevation by `height` for every cell whose
/// center lies within `half_width_m` of the vertical line `x = x_center`.
#[allow(dead_code)]
pub fn add_vertical_ridge(raster: &mut SurfaceRaster, x_center: f64, half_width_m: f64, height: f32) {
    for row in 0..raster.rows {
        for col in 0..raster.cols {
            let (x, _y) = raster.cell_center(row, col);
            if (x - x_center).abs() <= half_width_m {
                let idx = row as usize * raster.cols as usize + col as usize;
                raster.ground[idx] += height;
                raster.surface[idx] += height;
            }
        }
    }
}

/// Raises ground and surface elevation by `height` for every cell whose
/// center lies within `half_width_m` of the horizontal line `y = y_center`,
/// simulating a ridge bisecting the raster's short axis lengthwise.
pub fn add_horizontal_ridge(raster: &mut SurfaceRaster, y_center: f64, half_width_m: f64, height: f32) {
    for row in 0..raster.rows {
        for col in 0..raster.cols {
            let (_x, y) = raster.cell_center(row, col);
            if (y - y_center).abs() <= half_width_m {
                let idx = row as usize * raster.cols as usize + col as usize;
                raster.ground[idx] += height;
                raster.surface[idx] += height;
            }
        }
    }
}

/// Mission parameters for a `run_scenario` call, mirroring the fields of
/// `ProjectConfig` that matter once the raster is already in hand.
pub struct ScenarioParams {
    pub drone_agl_m: f64,
    pub max_vlos_m: f64,
    pub preferred_segment_acres: f64,
    pub grid_spacing_m: f64,
    pub access_set: BTreeSet<AccessMode>,
    pub access_buffer_m: f64,
}

/// Runs the grid-generation-through-assembly stages of `pipeline::compute`
/// against an already-built raster and CRS, exactly mirroring
/// `pipeline.rs`'s body after `raster::prepare` returns.
pub fn run_scenario(
    polygon_metric: &Polygon<f64>,
    raster: &SurfaceRaster,
    crs: &CrsResolver,
    params: &ScenarioParams,
    roads: &[LineString<f64>],
    trails: &[LineString<f64>],
    cancel: &CancelToken,
) -> Result<ComputeResult> {
    let candidates = grid::generate(polygon_metric, params.grid_spacing_m);
    let candidates_generated = candidates.len();

    let classified = access::classify(&candidates, roads, trails, params.access_buffer_m, &params.access_set);
    let candidates_retained = classified.len();

    let viewsheds = viewshed::compute_all(
        &classified,
        raster,
        params.drone_agl_m,
        params.max_vlos_m,
        cancel,
        |_, _| {},
    )?;

    let total_cells = (raster.rows as usize) * (raster.cols as usize);
    let total_target_cells = raster.target_cell_count();
    let preferred_cells = params.preferred_segment_acres * 4046.8564224 / (raster.cell_size * raster.cell_size);
    let min_useful_cells = coverage::default_min_useful_cells(preferred_cells);

    let selections = coverage::select(&viewsheds, total_cells, preferred_cells, min_useful_cells);
    let candidates_selected = selections.len();

    let segments = assemble::assemble_segments(&selections, &viewsheds, raster, polygon_metric, crs)?;

    let cells_covered: usize = selections.iter().map(|s| s.new_cells.len()).sum();
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
            cells_visible_union: cells_covered,
            cells_covered,
        },
    })
}

#[allow(dead_code)]
pub fn anywhere() -> BTreeSet<AccessMode> {
    [AccessMode::Anywhere].into_iter().collect()
}

/// Degrees-per-meter at the equator, close enough for fixtures kept near
/// `lat = 0` where longitude and latitude scale almost identically.
pub fn meters_to_deg(m: f64) -> f64 {
    m / 111_320.0
}
