//! Chooses a metric projection for a search polygon and exposes forward
//! (WGS84 -> metric) and inverse (metric -> WGS84) transforms.
//!
//! Grounded in the teacher's `gpkg.rs` reprojection code: both build a
//! `proj::Proj` from a pair of CRS strings via `Proj::new_known_crs` and
//! call `.convert((x, y))` per point. The teacher always targets
//! `EPSG:4326`; here the target is chosen dynamically from the polygon.

use geo::{Centroid, Polygon};
use proj::Proj;

use crate::error::{Result, SegError};
use crate::geometry::MetricBbox;

/// A resolved metric CRS plus its paired transforms against WGS84.
pub struct CrsResolver {
    epsg: u32,
    to_metric: Proj,
    to_geographic: Proj,
}

impl CrsResolver {
    /// Picks the UTM zone containing the polygon centroid's longitude, or a
    /// polar-stereographic CRS when the centroid latitude lies above 84°N
    /// or below 80°S.
    pub fn resolve(polygon_wgs84: &Polygon<f64>) -> Result<CrsResolver> {
        let centroid = polygon_wgs84
            .centroid()
            .ok_or_else(|| SegError::InvalidPolygon("could not compute centroid".to_string()))?;
        let lon = centroid.x();
        let lat = centroid.y();

        if !(-89.9..=89.9).contains(&lat) {
            return Err(SegError::InvalidParameter(format!(
                "polygon centroid latitude {lat} outside [-89.9, 89.9]"
            )));
        }

        let epsg = epsg_for(lon, lat);
        CrsResolver::for_epsg(epsg)
    }

    fn for_epsg(epsg: u32) -> Result<CrsResolver> {
        let target = format!("EPSG:{epsg}");
        let to_metric = Proj::new_known_crs("EPSG:4326", &target, None)?;
        let to_geographic = Proj::new_known_crs(&target, "EPSG:4326", None)?;
        Ok(CrsResolver {
            epsg,
            to_metric,
            to_geographic,
        })
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Forward transform: WGS84 (lon, lat) -> metric (easting, northing).
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        self.to_metric
            .convert((lon, lat))
            .map_err(SegError::from)
    }

    /// Inverse transform: metric (easting, northing) -> WGS84 (lon, lat).
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        self.to_geographic
            .convert((x, y))
            .map_err(SegError::from)
    }

    /// Reprojects every exterior/interior ring vertex of a WGS84 polygon to
    /// the resolved metric CRS.
    pub fn forward_polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>> {
        self.map_polygon(polygon, |lon, lat| self.forward(lon, lat))
    }

    /// Reprojects a metric-CRS polygon back to WGS84.
    pub fn inverse_polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>> {
        self.map_polygon(polygon, |x, y| self.inverse(x, y))
    }

    fn map_polygon(
        &self,
        polygon: &Polygon<f64>,
        f: impl Fn(f64, f64) -> Result<(f64, f64)>,
    ) -> Result<Polygon<f64>> {
        use geo::coord;

        let map_ring = |ring: &geo::LineString<f64>| -> Result<geo::LineString<f64>> {
            let mut coords = Vec::with_capacity(ring.0.len());
            for c in ring.coords() {
                let (nx, ny) = f(c.x, c.y)?;
                coords.push(coord! { x: nx, y: ny });
            }
            Ok(geo::LineString::from(coords))
        };

        let exterior = map_ring(polygon.exterior())?;
        let mut interiors = Vec::with_capacity(polygon.interiors().len());
        for interior in polygon.interiors() {
            interiors.push(map_ring(interior)?);
        }
        Ok(Polygon::new(exterior, interiors))
    }

    /// Bounding box of the polygon in metric coordinates, inflated by
    /// `margin_m` (used by the raster preparer for the DEM clip window).
    pub fn metric_bbox(&self, polygon_wgs84: &Polygon<f64>, margin_m: f64) -> Result<MetricBbox> {
        let metric = self.forward_polygon(polygon_wgs84)?;
        Ok(MetricBbox::of_polygon(&metric).inflate(margin_m))
    }

    /// Area of a polygon already expressed in metric coordinates, in acres.
    pub fn area_acres(&self, polygon_metric: &Polygon<f64>) -> f64 {
        use geo::Area;
        polygon_metric.unsigned_area() / 4046.8564224
    }
}

/// EPSG code for the UTM zone (or polar-stereographic CRS) containing
/// `(lon, lat)`.
fn epsg_for(lon: f64, lat: f64) -> u32 {
    if lat > 84.0 {
        return 3413; // WGS84 / NSIDC Sea Ice Polar Stereographic North
    }
    if lat < -80.0 {
        return 3976; // WGS84 / NSIDC Sea Ice Polar Stereographic South
    }
    let zone = (((lon + 180.0) / 6.0).floor() as i64 + 1).clamp(1, 60);
    if lat >= 0.0 {
        32600 + zone as u32
    } else {
        32700 + zone as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn utm_zone_northern_hemisphere() {
        assert_eq!(epsg_for(-4.5, 48.2), 32630);
    }

    #[test]
    fn utm_zone_southern_hemisphere() {
        assert_eq!(epsg_for(151.2, -33.9), 32756);
    }

    #[test]
    fn polar_stereographic_north_above_84() {
        assert_eq!(epsg_for(10.0, 85.0), 3413);
    }

    #[test]
    fn polar_stereographic_south_below_80() {
        assert_eq!(epsg_for(10.0, -81.0), 3976);
    }

    #[test]
    fn resolve_rejects_out_of_range_centroid() {
        let poly = polygon![
            (x: 0.0, y: 89.95),
            (x: 0.1, y: 89.95),
            (x: 0.1, y: 89.96),
            (x: 0.0, y: 89.96),
        ];
        let result = CrsResolver::resolve(&poly);
        assert!(result.is_err());
    }

    #[test]
    fn round_trip_forward_inverse_near_identity() {
        let poly = polygon![
            (x: -4.5, y: 48.0),
            (x: -4.4, y: 48.0),
            (x: -4.4, y: 48.1),
            (x: -4.5, y: 48.1),
        ];
        let resolver = CrsResolver::resolve(&poly).expect("resolve");
        let (x, y) = resolver.forward(-4.45, 48.05).expect("forward");
        let (lon, lat) = resolver.inverse(x, y).expect("inverse");
        approx::assert_abs_diff_eq!(lon, -4.45, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(lat, 48.05, epsilon = 1e-6);
    }
}
