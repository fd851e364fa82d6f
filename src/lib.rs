//! Drone search-segment planner: viewshed-constrained maximum-coverage
//! segmentation for Search-and-Rescue missions.
//!
//! The [`pipeline::compute`] entry point is the crate's single external
//! interface: it never touches the filesystem or process exit codes
//! itself; that is the `sarseg` CLI binary's job. A non-CLI driver (an
//! HTTP API, a batch job) can depend on this crate directly and call
//! `compute` the same way.

pub mod access;
pub mod assemble;
pub mod cancel;
pub mod coverage;
pub mod crs;
pub mod error;
pub mod geojson;
pub mod geometry;
pub mod grid;
pub mod logger;
pub mod pipeline;
pub mod polygon;
pub mod progress;
pub mod project;
pub mod raster;
pub mod viewshed;

pub use cancel::CancelToken;
pub use error::{ErrorKind, Result, SegError};
pub use pipeline::compute;
pub use progress::{NullSink, ProgressEvent, ProgressSink};
pub use project::{
    AccessMode, ComputeDiagnostics, ComputeResult, ProjectConfig, ProjectStatus, RasterInputs,
    Segment, VectorInputs,
};
