//! Reconstructs each selected candidate's segment polygon from its
//! disjoint cell set, clipped to the search polygon (§4.7).

pub mod trace;

use std::collections::{HashSet, VecDeque};

use geo::{Area, BooleanOps, MultiPolygon, Polygon, Simplify};

use crate::error::{Result, SegError};
use crate::geometry::SegmentGeometry;
use crate::raster::SurfaceRaster;
use crate::viewshed::cellset::CellSet;

/// Groups a segment's raw cell set into 4-connected components, traces
/// each into a polygon, simplifies at `c/2`, clips to the search polygon,
/// and drops any resulting piece smaller than `0.25 * c^2`.
///
/// When every component is dropped as noise the segment has no geometry;
/// callers should treat that candidate as contributing nothing and skip
/// it rather than emit an empty segment.
pub fn build_segment_geometry(
    new_cells: &CellSet,
    raster: &SurfaceRaster,
    search_polygon_metric: &Polygon<f64>,
) -> Result<Option<SegmentGeometry>> {
    let components = group_components(new_cells, raster.cols);
    let tolerance = raster.cell_size / 2.0;
    let min_area = 0.25 * raster.cell_size * raster.cell_size;

    let mut polygons = Vec::new();
    for component in components {
        let raw = trace::trace_component(&component, raster.origin_x, raster.origin_y, raster.cell_size)?;
        let simplified = raw.simplify(&tolerance);
        let clipped = simplified.intersection(search_polygon_metric);
        for polygon in clipped.0 {
            if polygon.unsigned_area() >= min_area {
                polygons.push(polygon);
            }
        }
    }

    match polygons.len() {
        0 => Ok(None),
        1 => Ok(Some(SegmentGeometry::Polygon(polygons.into_iter().next().unwrap()))),
        _ => Ok(Some(SegmentGeometry::MultiPolygon(MultiPolygon::new(polygons)))),
    }
}

/// Groups flat raster cell indices into maximal 4-connected components.
fn group_components(cells: &CellSet, cols: u32) -> Vec<HashSet<(u32, u32)>> {
    let all: HashSet<usize> = cells.iter().collect();
    let mut unvisited = all.clone();
    let mut components = Vec::new();

    while let Some(&start) = unvisited.iter().next() {
        let mut component = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        unvisited.remove(&start);

        while let Some(index) = queue.pop_front() {
            let row = (index / cols as usize) as u32;
            let col = (index % cols as usize) as u32;
            component.insert((row, col));

            for (dr, dc) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
                let nr = row as i64 + dr;
                let nc = col as i64 + dc;
                if nr < 0 || nc < 0 {
                    continue;
                }
                let neighbor_index = nr as usize * cols as usize + nc as usize;
                if unvisited.remove(&neighbor_index) {
                    queue.push_back(neighbor_index);
                }
            }
        }
        components.push(component);
    }

    components
}

/// Validates the post-build invariant I2: segment geometries must be
/// pairwise non-overlapping beyond shared boundaries. A violation is an
/// algorithm bug, not a recoverable data condition, so this returns
/// `SegError::Internal` for the pipeline to surface as fatal (§4.7, §7).
pub fn validate_no_overlap(segments: &[SegmentGeometry]) -> Result<()> {
    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            let a = segments[i].as_multi_polygon();
            let b = segments[j].as_multi_polygon();
            let overlap = a.intersection(&b);
            if overlap.0.iter().any(|p| p.unsigned_area() > 1e-6) {
                return Err(SegError::Internal(format!(
                    "segments {i} and {j} overlap after build"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn raster(rows: u32, cols: u32) -> SurfaceRaster {
        let count = (rows as usize) * (cols as usize);
        SurfaceRaster {
            rows,
            cols,
            origin_x: 0.0,
            origin_y: rows as f64 * 10.0,
            cell_size: 10.0,
            ground: vec![100.0; count],
            surface: vec![100.0; count],
            target_mask: vec![true; count],
        }
    }

    #[test]
    fn group_components_splits_disjoint_blobs() {
        let mut cells = CellSet::sparse();
        for idx in [0usize, 1, 20, 21] {
            cells.insert(idx);
        }
        let components = group_components(&cells, 10);
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn build_segment_geometry_clips_to_search_polygon() {
        let raster = raster(10, 10);
        let mut cells = CellSet::sparse();
        for row in 0..10u32 {
            for col in 0..10u32 {
                cells.insert(row as usize * 10 + col as usize);
            }
        }
        let search_polygon = polygon![
            (x: 0.0, y: 0.0),
            (x: 50.0, y: 0.0),
            (x: 50.0, y: 50.0),
            (x: 0.0, y: 50.0),
        ];
        let geometry = build_segment_geometry(&cells, &raster, &search_polygon)
            .unwrap()
            .expect("non-empty geometry");
        assert!(geometry.area_m2() <= 2500.0 + 1.0);
    }

    #[test]
    fn validate_no_overlap_accepts_disjoint_segments() {
        let a = SegmentGeometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0),
        ]);
        let b = SegmentGeometry::Polygon(polygon![
            (x: 20.0, y: 0.0), (x: 30.0, y: 0.0), (x: 30.0, y: 10.0), (x: 20.0, y: 10.0),
        ]);
        assert!(validate_no_overlap(&[a, b]).is_ok());
    }

    #[test]
    fn validate_no_overlap_rejects_overlapping_segments() {
        let a = SegmentGeometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0),
        ]);
        let b = SegmentGeometry::Polygon(polygon![
            (x: 5.0, y: 0.0), (x: 15.0, y: 0.0), (x: 15.0, y: 10.0), (x: 5.0, y: 10.0),
        ]);
        assert!(validate_no_overlap(&[a, b]).is_err());
    }
}
