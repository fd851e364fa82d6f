//! The data model of §3: project configuration, segments, the compute
//! result, and the project status state machine of §5.

use std::collections::BTreeSet;
use std::path::PathBuf;

use geo::Polygon;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result, SegError};
use crate::geometry::SegmentGeometry;

/// One of the four access modes a launch candidate can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    Road,
    Trail,
    OffRoad,
    Anywhere,
}

impl AccessMode {
    /// Tie-break priority used by the coverage selector: road > trail >
    /// off_road > anywhere. Higher is more preferred.
    pub fn priority(&self) -> u8 {
        match self {
            AccessMode::Road => 3,
            AccessMode::Trail => 2,
            AccessMode::OffRoad => 1,
            AccessMode::Anywhere => 0,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Road => "road",
            AccessMode::Trail => "trail",
            AccessMode::OffRoad => "off_road",
            AccessMode::Anywhere => "anywhere",
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paths to the optional raster/vector inputs named in the config; kept
/// separate from `ProjectConfig` because they are filesystem concerns the
/// CLI resolves, not part of the immutable mission parameters.
#[derive(Debug, Clone)]
pub struct RasterInputs {
    pub dem_path: PathBuf,
    pub vegetation_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct VectorInputs {
    pub roads_path: Option<PathBuf>,
    pub trails_path: Option<PathBuf>,
}

/// Immutable mission parameters, accepted once and never mutated for the
/// lifetime of a `compute()` invocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    pub name: String,
    /// Search-area polygon as an embedded GeoJSON geometry (RFC 7946),
    /// WGS84 longitude/latitude.
    pub search_area: serde_json::Value,
    pub drone_agl_m: f64,
    pub preferred_segment_acres: f64,
    pub max_vlos_m: f64,
    pub access_set: BTreeSet<AccessMode>,
    pub access_buffer_m: f64,
    pub grid_spacing_m: f64,
}

impl ProjectConfig {
    /// Validates range/non-emptiness constraints from §3 and returns the
    /// parsed search polygon. Detected as early as possible, per §7 policy.
    pub fn validate_and_parse_polygon(&self) -> Result<Polygon<f64>> {
        if !(self.drone_agl_m > 0.0 && self.drone_agl_m <= 500.0) {
            return Err(SegError::InvalidParameter(format!(
                "drone_agl_m must be in (0, 500], got {}",
                self.drone_agl_m
            )));
        }
        if !(self.preferred_segment_acres > 0.0) {
            return Err(SegError::InvalidParameter(
                "preferred_segment_acres must be > 0".to_string(),
            ));
        }
        if !(self.max_vlos_m > 0.0) {
            return Err(SegError::InvalidParameter(
                "max_vlos_m must be > 0".to_string(),
            ));
        }
        if self.access_buffer_m < 0.0 {
            return Err(SegError::InvalidParameter(
                "access_buffer_m must be >= 0".to_string(),
            ));
        }
        if !(self.grid_spacing_m > 0.0) {
            return Err(SegError::InvalidParameter(
                "grid_spacing_m must be > 0".to_string(),
            ));
        }
        if self.access_set.is_empty() {
            return Err(SegError::EmptyAccessSet);
        }

        let content = serde_json::to_string(&self.search_area)?;
        let reader = crate::geojson::GeojsonReader::from_str(&content)?;
        let polygon = reader.first_polygon()?;

        if polygon.exterior().coords().count() < 4 {
            return Err(SegError::InvalidPolygon(
                "exterior ring needs at least 4 vertices".to_string(),
            ));
        }

        Ok(polygon)
    }
}

/// One selected launch candidate and the segment it uniquely covers.
#[derive(Debug, Clone)]
pub struct Segment {
    pub sequence: u32,
    pub launch_lon: f64,
    pub launch_lat: f64,
    pub geometry_wgs84: SegmentGeometry,
    pub area_m2: f64,
    pub area_acres: f64,
    pub access_mode: AccessMode,
    pub ground_elev_m: f64,
}

/// Diagnostic counters reported alongside the segment list.
#[derive(Debug, Clone, Default)]
pub struct ComputeDiagnostics {
    pub candidates_generated: usize,
    pub candidates_retained: usize,
    pub candidates_selected: usize,
    pub cells_total: usize,
    pub cells_visible_union: usize,
    pub cells_covered: usize,
}

/// The output of a single `compute()` invocation.
#[derive(Debug, Clone)]
pub struct ComputeResult {
    pub segments: Vec<Segment>,
    pub coverage_fraction: f64,
    pub epsg: u32,
    pub diagnostics: ComputeDiagnostics,
}

/// The project status state machine of §5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Created,
    Processing,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
}

impl ProjectStatus {
    /// Whether `next` is a legal transition from `self`. A second
    /// `Processing` invocation while one is already in flight is a
    /// `ConflictError`, not a state-machine violation; callers check
    /// that separately before calling this.
    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;
        matches!(
            (self, next),
            (Created, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
                | (Processing, Cancelling)
                | (Cancelling, Cancelled)
        )
    }
}

/// Maps a pipeline outcome onto the terminal status and a single-line
/// error message, per §7's "status field reflects outcome" policy.
pub fn status_for_error(err: &SegError) -> (ProjectStatus, ErrorKind) {
    let kind = err.kind();
    let status = match kind {
        ErrorKind::Cancelled => ProjectStatus::Cancelled,
        _ => ProjectStatus::Failed,
    };
    (status, kind)
}
