//! Candidate vantage point generation: a regular lattice over the search
//! polygon's bounding rectangle, intersected with the polygon interior.
//!
//! Generalizes the teacher's `math.rs` world/screen conversion idiom from
//! degrees-per-pixel image coordinates to meters-per-cell raster
//! addressing; the lattice-walk itself has no teacher precedent and is
//! built directly from spec.md §4.3's ordering rule.

use geo::{Contains, Coord, Polygon};

use crate::geometry::MetricBbox;

/// A candidate launch point prior to access classification or viewshed
/// computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

/// Generates an axis-aligned lattice over `polygon`'s bounding rectangle at
/// `grid_spacing_m`, origin aligned to the rectangle's lower-left corner,
/// retaining only points whose enclosing `grid_spacing_m` cell's centroid
/// is inside the polygon (spec.md §4.3); the retained candidate sits at
/// that same centroid, the corner indexed by `(row, col)` being the cell's
/// origin rather than the vantage point itself. Ordered row-major by
/// northing descending, then easting ascending.
pub fn generate(polygon: &Polygon<f64>, grid_spacing_m: f64) -> Vec<Candidate> {
    let bbox = MetricBbox::of_polygon(polygon);
    let cols = (bbox.width() / grid_spacing_m).floor() as i64 + 1;
    let rows = (bbox.height() / grid_spacing_m).floor() as i64 + 1;
    let half = grid_spacing_m / 2.0;

    let mut candidates = Vec::new();
    // Northing descending: walk rows from the top (max_y) down.
    for row in (0..=rows).rev() {
        let origin_y = bbox.min_y + row as f64 * grid_spacing_m;
        let y = origin_y + half;
        if origin_y > bbox.max_y {
            continue;
        }
        for col in 0..=cols {
            let origin_x = bbox.min_x + col as f64 * grid_spacing_m;
            let x = origin_x + half;
            if origin_x > bbox.max_x {
                continue;
            }
            if polygon.contains(&Coord { x, y }) {
                candidates.push(Candidate { index: 0, x, y });
            }
        }
    }

    for (i, candidate) in candidates.iter_mut().enumerate() {
        candidate.index = i;
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn lattice_covers_unit_square_interior() {
        let polygon = polygon![
            (x: 0.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 100.0, y: 100.0),
            (x: 0.0, y: 100.0),
        ];
        let candidates = generate(&polygon, 25.0);
        assert!(!candidates.is_empty());
        for c in &candidates {
            assert!(c.x >= 0.0 && c.x <= 100.0);
            assert!(c.y >= 0.0 && c.y <= 100.0);
        }
    }

    #[test]
    fn ordering_is_northing_descending_then_easting_ascending() {
        let polygon = polygon![
            (x: 0.0, y: 0.0),
            (x: 50.0, y: 0.0),
            (x: 50.0, y: 50.0),
            (x: 0.0, y: 50.0),
        ];
        let candidates = generate(&polygon, 25.0);
        for pair in candidates.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(a.y > b.y || (a.y == b.y && a.x <= b.x));
        }
    }

    #[test]
    fn retains_enclosing_cell_centroid_not_lattice_vertex() {
        // Hypotenuse x + y = 25. The lattice vertex at (10, 10) lies
        // strictly inside (sum 20), but that cell's centroid at (15, 15)
        // lies outside (sum 30), so this candidate must be dropped.
        let triangle = polygon![
            (x: 0.0, y: 0.0),
            (x: 25.0, y: 0.0),
            (x: 0.0, y: 25.0),
        ];
        let candidates = generate(&triangle, 10.0);
        assert!(candidates.iter().all(|c| c.x + c.y < 25.0));
        assert!(candidates
            .iter()
            .any(|c| (c.x - 5.0).abs() < 1e-9 && (c.y - 5.0).abs() < 1e-9));
    }

    #[test]
    fn indices_are_assigned_in_emission_order() {
        let polygon = polygon![
            (x: 0.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 100.0, y: 100.0),
            (x: 0.0, y: 100.0),
        ];
        let candidates = generate(&polygon, 50.0);
        for (i, c) in candidates.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }
}
