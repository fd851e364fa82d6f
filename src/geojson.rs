//! GeoJSON reading and parsing: search-area polygons embedded in a project
//! config, and road/trail line layers consumed by [`crate::access`]. Per
//! §6's vector-input contract, line layers may also arrive as ESRI
//! shapefile-family files; [`read_line_layer`] dispatches on extension.

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;

use crate::error::{Result, SegError};

/// Reader for GeoJSON files carrying polygon geometry (the search area
/// embedded in a project config).
///
/// Assumes WGS84 (EPSG:4326) coordinates, per RFC 7946.
pub struct GeojsonReader {
    geometries: Vec<MultiPolygon<f64>>,
}

impl GeojsonReader {
    /// Parses GeoJSON polygon geometry from a string (the config file's
    /// embedded search-area field), rather than a standalone file.
    pub fn from_str(content: &str) -> Result<Self> {
        let content = preprocess_geojson(content);
        let geojson: GeoJson = content.parse()?;

        let geometries = extract_polygon_geometries(&geojson);
        if geometries.is_empty() {
            return Err(SegError::InvalidPolygon(
                "no polygon geometry found in search area".to_string(),
            ));
        }
        Ok(Self { geometries })
    }

    /// Returns the first parsed geometry's first polygon, the canonical
    /// single search-area polygon this crate operates on.
    pub fn first_polygon(&self) -> Result<Polygon<f64>> {
        self.geometries
            .first()
            .and_then(|mp| mp.0.first().cloned())
            .ok_or_else(|| SegError::InvalidPolygon("search area is empty".to_string()))
    }
}

/// Reads a road or trail vector layer as `LineString` geometry, used by
/// [`crate::access`]. Dispatches on file extension: `.shp` (plus its
/// sibling `.shx`/`.dbf`) is read via the `shapefile` crate; anything else
/// is parsed as line GeoJSON. Point and polygon features in the same file
/// are ignored either way.
pub fn read_line_layer(path: &Path) -> Result<Vec<LineString<f64>>> {
    let is_shapefile = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("shp"))
        .unwrap_or(false);

    if is_shapefile {
        read_shapefile_line_layer(path)
    } else {
        read_geojson_line_layer(path)
    }
}

fn read_geojson_line_layer(path: &Path) -> Result<Vec<LineString<f64>>> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SegError::FileNotFound(path.display().to_string())
        } else {
            SegError::Io(e)
        }
    })?;

    let content = preprocess_geojson(&content);
    let geojson: GeoJson = content.parse()?;

    Ok(extract_line_geometries(&geojson))
}

/// Reads line geometry from an ESRI shapefile (`.shp`/`.shx`/`.dbf` triple).
/// Only `Polyline`/`PolylineZ`/`PolylineM` shapes contribute; every part of
/// a multi-part polyline becomes its own `LineString`, matching the
/// GeoJSON `MultiLineString` expansion above.
fn read_shapefile_line_layer(path: &Path) -> Result<Vec<LineString<f64>>> {
    use shapefile::{Reader, Shape};

    if !path.exists() {
        return Err(SegError::FileNotFound(path.display().to_string()));
    }
    let mut reader = Reader::from_path(path).map_err(SegError::Shapefile)?;

    let mut lines = Vec::new();
    for shape in reader.iter_shapes() {
        let shape = shape?;
        match shape {
            Shape::Polyline(polyline) => {
                for part in polyline.parts() {
                    let coords: Vec<Coord<f64>> =
                        part.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
                    if !coords.is_empty() {
                        lines.push(LineString::from(coords));
                    }
                }
            }
            Shape::PolylineZ(polyline) => {
                for part in polyline.parts() {
                    let coords: Vec<Coord<f64>> =
                        part.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
                    if !coords.is_empty() {
                        lines.push(LineString::from(coords));
                    }
                }
            }
            Shape::PolylineM(polyline) => {
                for part in polyline.parts() {
                    let coords: Vec<Coord<f64>> =
                        part.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
                    if !coords.is_empty() {
                        lines.push(LineString::from(coords));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(lines)
}

/// Pre-process GeoJSON content to fix common malformed patterns seen in
/// vector layers exported from legacy GIS tools.
fn preprocess_geojson(content: &str) -> String {
    let content = content.replace(r#""type":"""#, r#""type":"MultiPolygon""#);
    let content = content.replace(r#""type": """#, r#""type": "MultiPolygon""#);
    content.replace("\"\"", "\"")
}

fn extract_polygon_geometries(geojson: &GeoJson) -> Vec<MultiPolygon<f64>> {
    let mut geometries = Vec::new();
    visit_geometries(geojson, |geom| {
        if let Some(mp) = geometry_to_multipolygon(geom) {
            geometries.push(mp);
        }
    });
    geometries
}

fn extract_line_geometries(geojson: &GeoJson) -> Vec<LineString<f64>> {
    let mut lines = Vec::new();
    visit_geometries(geojson, |geom| {
        lines.extend(geometry_to_linestrings(geom));
    });
    lines
}

fn visit_geometries<'a>(geojson: &'a GeoJson, mut f: impl FnMut(&'a Geometry)) {
    match geojson {
        GeoJson::Geometry(geom) => f(geom),
        GeoJson::Feature(feature) => {
            if let Some(ref geom) = feature.geometry {
                f(geom);
            }
        }
        GeoJson::FeatureCollection(collection) => {
            for feature in &collection.features {
                if let Some(ref geom) = feature.geometry {
                    f(geom);
                }
            }
        }
    }
}

fn geometry_to_multipolygon(geom: &Geometry) -> Option<MultiPolygon<f64>> {
    match &geom.value {
        Value::Polygon(coords) => {
            let polygon = polygon_from_coords(coords)?;
            Some(MultiPolygon::new(vec![polygon]))
        }
        Value::MultiPolygon(multi_coords) => {
            let polygons: Vec<Polygon<f64>> = multi_coords
                .iter()
                .filter_map(|coords| polygon_from_coords(coords))
                .collect();
            if polygons.is_empty() {
                None
            } else {
                Some(MultiPolygon::new(polygons))
            }
        }
        _ => None,
    }
}

fn geometry_to_linestrings(geom: &Geometry) -> Vec<LineString<f64>> {
    match &geom.value {
        Value::LineString(coords) => linestring_from_coords(coords).into_iter().collect(),
        Value::MultiLineString(multi_coords) => {
            let mls: MultiLineString<f64> = MultiLineString::new(
                multi_coords
                    .iter()
                    .filter_map(|coords| linestring_from_coords(coords))
                    .collect(),
            );
            mls.0
        }
        _ => Vec::new(),
    }
}

fn polygon_from_coords(coords: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    if coords.is_empty() {
        return None;
    }
    let exterior = linestring_from_coords(&coords[0])?;
    let interiors: Vec<LineString<f64>> = coords[1..]
        .iter()
        .filter_map(|ring| linestring_from_coords(ring))
        .collect();
    Some(Polygon::new(exterior, interiors))
}

fn linestring_from_coords(coords: &[Vec<f64>]) -> Option<LineString<f64>> {
    if coords.is_empty() {
        return None;
    }
    let points: Vec<Coord<f64>> = coords
        .iter()
        .filter_map(|point| {
            if point.len() >= 2 {
                Some(Coord {
                    x: point[0],
                    y: point[1],
                })
            } else {
                None
            }
        })
        .collect();
    if points.is_empty() {
        None
    } else {
        Some(LineString::from(points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_line_layer_dispatches_geojson_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trails.geojson");
        std::fs::write(
            &path,
            r#"{"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 0.0]]}"#,
        )
        .unwrap();
        let lines = read_line_layer(&path).expect("read");
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn read_line_layer_routes_shp_extension_to_shapefile_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_roads.shp");
        let err = read_line_layer(&path).unwrap_err();
        assert!(matches!(err, SegError::FileNotFound(_)));
    }

    #[test]
    fn parses_feature_collection_polygon() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
                    }
                }
            ]
        }"#;
        let reader = GeojsonReader::from_str(json).expect("parse");
        let polygon = reader.first_polygon().expect("polygon");
        assert_eq!(polygon.exterior().coords().count(), 5);
    }

    #[test]
    fn parses_raw_multipolygon() {
        let json = r#"{
            "type": "MultiPolygon",
            "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]]
        }"#;
        let reader = GeojsonReader::from_str(json).expect("parse");
        assert!(reader.first_polygon().is_ok());
    }

    #[test]
    fn empty_type_is_repaired_before_parsing() {
        let json = r#"{
            "type": "",
            "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]]
        }"#;
        let reader = GeojsonReader::from_str(json).expect("parse");
        assert!(reader.first_polygon().is_ok());
    }

    #[test]
    fn rejects_geojson_with_no_polygon() {
        let json = r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#;
        assert!(GeojsonReader::from_str(json).is_err());
    }

    #[test]
    fn extracts_linestrings_from_feature_collection() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]
                    }
                },
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [5.0, 5.0]
                    }
                }
            ]
        }"#;
        let geojson: GeoJson = json.parse().unwrap();
        let lines = extract_line_geometries(&geojson);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0.len(), 3);
    }

    #[test]
    fn extracts_multilinestring() {
        let json = r#"{
            "type": "MultiLineString",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0]], [[2.0, 2.0], [3.0, 3.0]]]
        }"#;
        let geojson: GeoJson = json.parse().unwrap();
        let lines = extract_line_geometries(&geojson);
        assert_eq!(lines.len(), 2);
    }
}
