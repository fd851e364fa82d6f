//! CLI argument parsing and validation for the `segment` command.

use clap::Parser;
use std::path::PathBuf;

use crate::error::{Result, SegError};
use crate::logger::VerbosityLevel;
use crate::project::{ProjectConfig, RasterInputs, VectorInputs};

/// Plans drone search segments for a Search-and-Rescue mission.
#[derive(Parser, Debug)]
#[command(name = "sarseg")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Project configuration file (JSON): mission parameters and the
    /// embedded search-area polygon.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Digital elevation model, GeoTIFF.
    #[arg(long)]
    pub dem: PathBuf,

    /// Optional vegetation-height raster, GeoTIFF.
    #[arg(long)]
    pub vegetation: Option<PathBuf>,

    /// Optional roads vector layer: line GeoJSON, or an ESRI shapefile
    /// (`.shp`) with its sibling `.shx`/`.dbf`.
    #[arg(long)]
    pub roads: Option<PathBuf>,

    /// Optional trails vector layer: line GeoJSON, or an ESRI shapefile
    /// (`.shp`) with its sibling `.shx`/`.dbf`.
    #[arg(long)]
    pub trails: Option<PathBuf>,

    /// Output directory; the GeoJSON artifact is written to
    /// `<out>/segments.geojson`.
    #[arg(short, long)]
    pub out: PathBuf,

    /// Worker thread count (default: all available cores).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (errors and the final result only).
    #[arg(short, long)]
    pub quiet: bool,
}

/// Fully validated configuration object.
#[derive(Debug)]
pub struct Config {
    pub project: ProjectConfig,
    pub raster_inputs: RasterInputs,
    pub vector_inputs: VectorInputs,
    pub out_dir: PathBuf,
    pub workers: Option<usize>,
    pub verbosity: VerbosityLevel,
}

impl Args {
    /// Validates arguments, loads and parses the project config file, and
    /// converts everything into a structured `Config`.
    pub fn validate(self) -> Result<Config> {
        if self.verbose && self.quiet {
            return Err(SegError::Config(
                "--verbose and --quiet are mutually exclusive".to_string(),
            ));
        }

        if !self.dem.exists() {
            return Err(SegError::FileNotFound(self.dem.display().to_string()));
        }

        let content = std::fs::read_to_string(&self.config).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SegError::FileNotFound(self.config.display().to_string())
            } else {
                SegError::Io(e)
            }
        })?;
        let project: ProjectConfig = serde_json::from_str(&content)?;

        let verbosity = if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        };

        Ok(Config {
            project,
            raster_inputs: RasterInputs {
                dem_path: self.dem,
                vegetation_path: self.vegetation,
            },
            vector_inputs: VectorInputs {
                roads_path: self.roads,
                trails_path: self.trails,
            },
            out_dir: self.out,
            workers: self.workers,
            verbosity,
        })
    }
}
