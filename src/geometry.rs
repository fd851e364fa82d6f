//! Geometric utilities shared by the raster, grid, and polygon stages.
//!
//! All distances here are in the metric CRS chosen by [`crate::crs`] (EPSG
//! projected coordinates, meters), never WGS84 degrees. Degrees only occur
//! at the [`crate::crs::CrsResolver`] boundary and in [`crate::project`]'s
//! `ProjectConfig`/`Segment` types.

use geo::{LineString, MultiPolygon, Polygon};

/// Axis-aligned bounding rectangle in metric coordinates (meters).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricBbox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl MetricBbox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Returns a new bbox expanded by `margin` meters on every side.
    pub fn inflate(&self, margin: f64) -> MetricBbox {
        MetricBbox::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Union of this bbox with another.
    pub fn union(&self, other: &MetricBbox) -> MetricBbox {
        MetricBbox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Bounding box of a polygon's exterior ring plus any interiors.
    pub fn of_polygon(polygon: &Polygon<f64>) -> MetricBbox {
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for coord in polygon.exterior().coords() {
            min_x = min_x.min(coord.x);
            min_y = min_y.min(coord.y);
            max_x = max_x.max(coord.x);
            max_y = max_y.max(coord.y);
        }
        MetricBbox::new(min_x, min_y, max_x, max_y)
    }
}

/// A raster cell address: row increases downward (north to south), col
/// increases rightward (west to east), matching the affine transform
/// convention used by [`crate::raster::SurfaceRaster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellIndex {
    pub row: u32,
    pub col: u32,
}

impl CellIndex {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Convert a metric world coordinate to fractional (row, col) given an
/// affine transform's origin and cell size. Row 0 is the northernmost row.
pub fn world_to_cell(x: f64, y: f64, origin_x: f64, origin_y: f64, cell_size: f64) -> (f64, f64) {
    let col = (x - origin_x) / cell_size;
    let row = (origin_y - y) / cell_size;
    (row, col)
}

/// Inverse of [`world_to_cell`]: returns the metric coordinate of a cell's
/// center.
pub fn cell_center_to_world(
    row: u32,
    col: u32,
    origin_x: f64,
    origin_y: f64,
    cell_size: f64,
) -> (f64, f64) {
    let x = origin_x + (col as f64 + 0.5) * cell_size;
    let y = origin_y - (row as f64 + 0.5) * cell_size;
    (x, y)
}

/// Euclidean distance between two metric points.
pub fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

/// A segment's geometry, tagged rather than erased behind a generic
/// geometry interface. A polygon builder component whose selected
/// candidate's cells form multiple disconnected components produces
/// `MultiPolygon`; a single connected region produces `Polygon`.
#[derive(Debug, Clone)]
pub enum SegmentGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl SegmentGeometry {
    /// Total area in square meters, summing over every ring's contribution
    /// (holes already subtract via `geo`'s shoelace formula on interiors).
    pub fn area_m2(&self) -> f64 {
        use geo::Area;
        match self {
            SegmentGeometry::Polygon(p) => p.unsigned_area(),
            SegmentGeometry::MultiPolygon(mp) => mp.unsigned_area(),
        }
    }

    pub fn as_multi_polygon(&self) -> MultiPolygon<f64> {
        match self {
            SegmentGeometry::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
            SegmentGeometry::MultiPolygon(mp) => mp.clone(),
        }
    }

    /// Number of 4-connected components (rings) that make up this geometry.
    pub fn component_count(&self) -> usize {
        match self {
            SegmentGeometry::Polygon(_) => 1,
            SegmentGeometry::MultiPolygon(mp) => mp.0.len(),
        }
    }
}

/// Builds a closed `geo::LineString` ring from an ordered list of metric
/// coordinates, closing it if the caller didn't repeat the first point.
pub fn close_ring(mut coords: Vec<geo::Coord<f64>>) -> LineString<f64> {
    if coords.first() != coords.last() {
        if let Some(first) = coords.first().copied() {
            coords.push(first);
        }
    }
    LineString::from(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    #[test]
    fn bbox_inflate_expands_all_sides() {
        let bbox = MetricBbox::new(0.0, 0.0, 100.0, 100.0);
        let inflated = bbox.inflate(10.0);
        assert_eq!(inflated.min_x, -10.0);
        assert_eq!(inflated.max_x, 110.0);
        assert_eq!(inflated.height(), 120.0);
    }

    #[test]
    fn world_to_cell_round_trips_center() {
        let origin_x = 500_000.0;
        let origin_y = 5_000_000.0;
        let cell_size = 10.0;
        let (x, y) = cell_center_to_world(3, 4, origin_x, origin_y, cell_size);
        let (row, col) = world_to_cell(x, y, origin_x, origin_y, cell_size);
        approx::assert_abs_diff_eq!(row, 3.5, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(col, 4.5, epsilon = 1e-9);
    }

    #[test]
    fn distance_is_euclidean() {
        approx::assert_abs_diff_eq!(distance(0.0, 0.0, 3.0, 4.0), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn close_ring_repeats_first_point() {
        let coords = vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: 0.0 },
            coord! { x: 1.0, y: 1.0 },
        ];
        let ring = close_ring(coords);
        assert_eq!(ring.0.first(), ring.0.last());
        assert_eq!(ring.0.len(), 4);
    }

    #[test]
    fn bbox_of_polygon_matches_extent() {
        let polygon = Polygon::new(
            close_ring(vec![
                coord! { x: -1.0, y: -1.0 },
                coord! { x: 2.0, y: -1.0 },
                coord! { x: 2.0, y: 3.0 },
                coord! { x: -1.0, y: 3.0 },
            ]),
            vec![],
        );
        let bbox = MetricBbox::of_polygon(&polygon);
        assert_eq!(bbox, MetricBbox::new(-1.0, -1.0, 2.0, 3.0));
    }
}
