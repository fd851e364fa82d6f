//! Transforms segment geometries and launch points back to WGS84,
//! assigns sequence numbers, attaches metrics, and emits the GeoJSON
//! output artifact (§4.8, §6).

use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{json, Map};

use crate::coverage::Selection;
use crate::crs::CrsResolver;
use crate::error::Result;
use crate::geometry::SegmentGeometry;
use crate::polygon;
use crate::project::Segment;
use crate::raster::SurfaceRaster;
use crate::viewshed::CandidateViewshed;

/// Builds the final, WGS84-projected segment list from the greedy
/// selector's output, in selection order (the segment sequence).
pub fn assemble_segments(
    selections: &[Selection],
    viewsheds: &[CandidateViewshed],
    raster: &SurfaceRaster,
    search_polygon_metric: &geo::Polygon<f64>,
    crs: &CrsResolver,
) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut metric_geometries = Vec::new();

    for selection in selections.iter() {
        let viewshed = &viewsheds[selection.viewshed_index];

        let Some(geometry_metric) =
            polygon::build_segment_geometry(&selection.new_cells, raster, search_polygon_metric)?
        else {
            continue;
        };

        let (launch_lon, launch_lat) = crs.inverse(viewshed.candidate.candidate.x, viewshed.candidate.candidate.y)?;
        let geometry_wgs84 = to_wgs84(&geometry_metric, crs)?;

        let area_m2 = geometry_metric.area_m2();
        let area_acres = area_m2 / 4046.8564224;

        metric_geometries.push(geometry_metric.clone());
        let sequence = (segments.len() + 1) as u32;
        segments.push(Segment {
            sequence,
            launch_lon,
            launch_lat,
            geometry_wgs84,
            area_m2,
            area_acres,
            access_mode: viewshed.candidate.access_mode,
            ground_elev_m: viewshed.ground_elev_m,
        });
    }

    polygon::validate_no_overlap(&metric_geometries)?;

    Ok(segments)
}

fn to_wgs84(geometry: &SegmentGeometry, crs: &CrsResolver) -> Result<SegmentGeometry> {
    match geometry {
        SegmentGeometry::Polygon(p) => Ok(SegmentGeometry::Polygon(crs.inverse_polygon(p)?)),
        SegmentGeometry::MultiPolygon(mp) => {
            let mut polygons = Vec::with_capacity(mp.0.len());
            for p in &mp.0 {
                polygons.push(crs.inverse_polygon(p)?);
            }
            Ok(SegmentGeometry::MultiPolygon(geo::MultiPolygon::new(polygons)))
        }
    }
}

/// Coverage fraction: union of covered target cells over the total target
/// cell count in the search polygon.
pub fn coverage_fraction(covered_cells: usize, total_cells: usize) -> f64 {
    if total_cells == 0 {
        0.0
    } else {
        covered_cells as f64 / total_cells as f64
    }
}

/// Serializes the final segment list as a GeoJSON `FeatureCollection`,
/// one `Feature` per segment, matching the teacher's
/// `output_dir.join(...)` convention for where artifacts land.
pub fn to_geojson(segments: &[Segment]) -> FeatureCollection {
    let features = segments
        .iter()
        .map(|segment| {
            let geometry = match &segment.geometry_wgs84 {
                SegmentGeometry::Polygon(p) => Geometry::new(Value::from(p)),
                SegmentGeometry::MultiPolygon(mp) => Geometry::new(Value::from(mp)),
            };

            let mut properties = Map::new();
            properties.insert("sequence".to_string(), json!(segment.sequence));
            properties.insert("area_acres".to_string(), json!(segment.area_acres));
            properties.insert("area_m2".to_string(), json!(segment.area_m2));
            properties.insert("access_type".to_string(), json!(segment.access_mode.to_string()));
            properties.insert(
                "launch_point".to_string(),
                json!({ "lon": segment.launch_lon, "lat": segment.launch_lat }),
            );
            properties.insert("ground_elev_m".to_string(), json!(segment.ground_elev_m));

            Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::AccessMode;
    use geo::polygon;

    fn segment(sequence: u32) -> Segment {
        Segment {
            sequence,
            launch_lon: -4.45,
            launch_lat: 48.05,
            geometry_wgs84: SegmentGeometry::Polygon(polygon![
                (x: -4.46, y: 48.04),
                (x: -4.44, y: 48.04),
                (x: -4.44, y: 48.06),
                (x: -4.46, y: 48.06),
            ]),
            area_m2: 40000.0,
            area_acres: 9.88,
            access_mode: AccessMode::Anywhere,
            ground_elev_m: 100.0,
        }
    }

    #[test]
    fn coverage_fraction_handles_zero_total() {
        assert_eq!(coverage_fraction(0, 0), 0.0);
    }

    #[test]
    fn coverage_fraction_computes_ratio() {
        assert!((coverage_fraction(50, 100) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn to_geojson_emits_one_feature_per_segment() {
        let segments = vec![segment(1), segment(2)];
        let collection = to_geojson(&segments);
        assert_eq!(collection.features.len(), 2);
        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["sequence"], json!(1));
        assert_eq!(props["access_type"], json!("anywhere"));
    }
}
