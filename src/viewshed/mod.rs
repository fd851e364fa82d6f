//! For each retained candidate, computes the set of target cells visible
//! from it under a horizon-angle raytracing viewshed on the surface
//! raster, within `max_vlos_m`.
//!
//! Parallelized with `rayon` following the teacher's `render.rs` banded
//! `into_par_iter` pattern: there, horizontal image bands over scanlines;
//! here, bands of the candidate list. `num_bands = current_num_threads() *
//! k` so bands are small enough to keep every worker busy even when
//! per-candidate cost varies (a candidate near the polygon edge sees far
//! fewer cells than one near the centroid).

pub mod cellset;

use rayon::prelude::*;

use crate::access::ClassifiedCandidate;
use crate::cancel::CancelToken;
use crate::error::{Result, SegError};
use crate::raster::SurfaceRaster;
use cellset::CellSet;

/// A classified candidate together with its computed visible-cell set.
/// Candidates whose visible set is empty are discarded by [`compute_all`].
pub struct CandidateViewshed {
    pub candidate: ClassifiedCandidate,
    pub ground_elev_m: f64,
    pub visible: CellSet,
}

/// Computes viewsheds for every candidate, sharded across the `rayon`
/// global pool. Checks `cancel` once per band; a cancelled run returns
/// `Err(SegError::Cancelled)` with no partial results.
pub fn compute_all(
    candidates: &[ClassifiedCandidate],
    raster: &SurfaceRaster,
    observer_height_m: f64,
    max_vlos_m: f64,
    cancel: &CancelToken,
    mut on_batch: impl FnMut(usize, usize),
) -> Result<Vec<CandidateViewshed>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let num_bands = rayon::current_num_threads().max(1) * 4;
    let band_size = candidates.len().div_ceil(num_bands).max(1);

    let mut results: Vec<Option<CandidateViewshed>> = Vec::with_capacity(candidates.len());
    let bands: Vec<&[ClassifiedCandidate]> = candidates.chunks(band_size).collect();
    let total_bands = bands.len();

    for (band_idx, band) in bands.into_iter().enumerate() {
        if cancel.is_cancelled() {
            cancel.acknowledge();
            return Err(SegError::Cancelled);
        }

        let band_started = std::time::Instant::now();
        let band_results: Vec<Option<CandidateViewshed>> = band
            .par_iter()
            .map(|classified| compute_one(classified, raster, observer_height_m, max_vlos_m))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            band = band_idx + 1,
            of = total_bands,
            candidates = band.len(),
            elapsed_ms = band_started.elapsed().as_millis() as u64,
            "viewshed batch done"
        );

        results.extend(band_results);
        on_batch(band_idx + 1, total_bands);
    }

    let visible: Vec<CandidateViewshed> = results.into_iter().flatten().collect();
    tracing::info!(
        candidates = candidates.len(),
        with_visibility = visible.len(),
        "viewshed computation complete"
    );
    Ok(visible)
}

fn compute_one(
    classified: &ClassifiedCandidate,
    raster: &SurfaceRaster,
    observer_height_m: f64,
    max_vlos_m: f64,
) -> Result<Option<CandidateViewshed>> {
    let (obs_row, obs_col) = nearest_cell(raster, classified.candidate.x, classified.candidate.y);
    let ground_elev = raster
        .ground_at(obs_row, obs_col)
        .ok_or(SegError::MissingElevation)? as f64;
    let observer_elev = ground_elev + observer_height_m;
    let (obs_x, obs_y) = raster.cell_center(obs_row, obs_col);

    let range_cells = (max_vlos_m / raster.cell_size).ceil() as i64 + 1;
    let row_lo = (obs_row as i64 - range_cells).max(0) as u32;
    let row_hi = ((obs_row as i64 + range_cells).max(0) as u32).min(raster.rows.saturating_sub(1));
    let col_lo = (obs_col as i64 - range_cells).max(0) as u32;
    let col_hi = ((obs_col as i64 + range_cells).max(0) as u32).min(raster.cols.saturating_sub(1));

    let mut visible = CellSet::sparse();

    for row in row_lo..=row_hi {
        for col in col_lo..=col_hi {
            if !raster.is_target(row, col) {
                continue;
            }
            let (x, y) = raster.cell_center(row, col);
            let dist = crate::geometry::distance(obs_x, obs_y, x, y);
            if dist > max_vlos_m {
                continue;
            }
            let Some(target_ground) = raster.ground_at(row, col) else {
                continue;
            };
            if is_visible(raster, obs_row, obs_col, observer_elev, row, col, target_ground as f64) {
                let index = row as usize * raster.cols as usize + col as usize;
                visible.insert(index);
            }
        }
    }

    if visible.is_empty() {
        Ok(None)
    } else {
        Ok(Some(CandidateViewshed {
            candidate: *classified,
            ground_elev_m: ground_elev,
            visible,
        }))
    }
}

fn nearest_cell(raster: &SurfaceRaster, x: f64, y: f64) -> (u32, u32) {
    let (row, col) = crate::geometry::world_to_cell(x, y, raster.origin_x, raster.origin_y, raster.cell_size);
    let row = row.floor().clamp(0.0, (raster.rows.saturating_sub(1)) as f64) as u32;
    let col = col.floor().clamp(0.0, (raster.cols.saturating_sub(1)) as f64) as u32;
    (row, col)
}

/// Horizon-angle line-of-sight test: walks the line from the observer cell
/// to the target cell one cell at a time along the cardinal that dominates
/// the azimuth, and rejects visibility if any sampled surface elevation
/// rises strictly above the straight-line sight elevation at that point.
/// Ties (equal elevation) count as visible.
#[allow(clippy::too_many_arguments)]
fn is_visible(
    raster: &SurfaceRaster,
    obs_row: u32,
    obs_col: u32,
    observer_elev: f64,
    target_row: u32,
    target_col: u32,
    target_ground: f64,
) -> bool {
    let drow = target_row as i64 - obs_row as i64;
    let dcol = target_col as i64 - obs_col as i64;
    let steps = drow.unsigned_abs().max(dcol.unsigned_abs());

    if steps == 0 {
        return true;
    }

    for step in 1..steps {
        let t = step as f64 / steps as f64;
        let row = (obs_row as f64 + t * drow as f64).round() as i64;
        let col = (obs_col as f64 + t * dcol as f64).round() as i64;
        if row < 0 || col < 0 {
            continue;
        }
        let (row, col) = (row as u32, col as u32);
        let Some(surface_elev) = raster.surface_at(row, col) else {
            continue;
        };
        let los_elev = observer_elev + t * (target_ground - observer_elev);
        if surface_elev as f64 > los_elev {
            return false;
        }
    }
    true
}
