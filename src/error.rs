//! Error taxonomy for the segmentation core.
//!
//! Every fallible operation in this crate returns [`SegError`]. The
//! variants map onto the five error kinds the project status field
//! must be able to report: config, data, resource, cancellation, and
//! internal invariant violations.

use thiserror::Error;

/// Machine-readable error category, independent of the human-readable message.
///
/// Exposed alongside `SegError` so a driver can branch on outcome (e.g. to
/// decide whether a retry with a coarser grid is worthwhile) without
/// string-matching the display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Data,
    Resource,
    Cancelled,
    Internal,
}

#[derive(Error, Debug)]
pub enum SegError {
    #[error("invalid search polygon: {0}")]
    InvalidPolygon(String),

    #[error("parameter out of range: {0}")]
    InvalidParameter(String),

    #[error("access set must contain at least one of road, trail, off_road, anywhere")]
    EmptyAccessSet,

    #[error("config file error: {0}")]
    Config(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("DEM does not intersect the search polygon")]
    DemOutsidePolygon,

    #[error("no elevation data for cell inside the search polygon after reprojection")]
    MissingElevation,

    #[error("raster has no usable cells: {0}")]
    EmptyRaster(String),

    #[error("vector layer unreadable: {0}")]
    VectorLayer(String),

    #[error("could not allocate raster or visibility buffer: {0}")]
    Resource(String),

    #[error("computation cancelled")]
    Cancelled,

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("projection error: {0}")]
    Proj(#[from] proj::ProjCreateError),

    #[error("projection conversion error: {0}")]
    ProjConvert(#[from] proj::ProjError),

    #[error("GeoJSON error: {0}")]
    Geojson(#[from] geojson::Error),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SegError>;

impl SegError {
    /// Maps this error onto the coarse kind the project status field records.
    pub fn kind(&self) -> ErrorKind {
        use SegError::*;
        match self {
            InvalidPolygon(_) | InvalidParameter(_) | EmptyAccessSet | Config(_) => {
                ErrorKind::Config
            }
            FileNotFound(_)
            | DemOutsidePolygon
            | MissingElevation
            | EmptyRaster(_)
            | VectorLayer(_)
            | Gdal(_)
            | Proj(_)
            | ProjConvert(_)
            | Geojson(_)
            | Shapefile(_)
            | Json(_)
            | Io(_) => ErrorKind::Data,
            Resource(_) => ErrorKind::Resource,
            Cancelled => ErrorKind::Cancelled,
            Internal(_) => ErrorKind::Internal,
        }
    }

    /// Exit code for the CLI surface, per the external interface contract.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Config => 2,
            ErrorKind::Data => 3,
            ErrorKind::Cancelled => 4,
            ErrorKind::Resource | ErrorKind::Internal => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_config_kind() {
        let err = SegError::InvalidParameter("drone_agl must be > 0".to_string());
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn cancelled_maps_to_exit_code_four() {
        assert_eq!(SegError::Cancelled.exit_code(), 4);
    }

    #[test]
    fn internal_maps_to_exit_code_five() {
        let err = SegError::Internal("segments overlap after build".to_string());
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn data_error_display() {
        let err = SegError::DemOutsidePolygon;
        assert_eq!(err.to_string(), "DEM does not intersect the search polygon");
    }
}
