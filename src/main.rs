mod cli;

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::Args;
use sarseg::logger::{self, Logger, VerbosityLevel};
use sarseg::{assemble, CancelToken, ProgressEvent, ProgressSink, SegError};

/// Entry point of the application.
fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Drives a single `compute()` invocation: parses and validates CLI
/// arguments, builds a sized thread pool, reports progress, and writes
/// the resulting segment plan as GeoJSON.
fn run() -> Result<(), SegError> {
    let args = Args::parse();
    let config = args.validate()?;

    Logger::init(config.verbosity);
    logger::init_tracing(config.verbosity);

    if !config.out_dir.exists() {
        std::fs::create_dir_all(&config.out_dir)?;
    }

    let workers = config.workers.unwrap_or_else(num_cpus::get);
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()
        .map_err(|e| SegError::Resource(e.to_string()))?;

    logger::info(&format!(
        "Planning segments for '{}' with {} worker thread(s)...",
        config.project.name, workers
    ));

    let show_progress = config.verbosity == VerbosityLevel::Normal;
    let pb = if show_progress {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let sink = CliProgressSink { bar: pb.as_ref() };
    let cancel = CancelToken::new();

    let start = Instant::now();
    let result = sarseg::compute(
        &config.project,
        &config.raster_inputs,
        &config.vector_inputs,
        &sink,
        &cancel,
    );

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    let result = result?;
    let elapsed = start.elapsed();

    let collection = assemble::to_geojson(&result.segments);
    let output_path = config.out_dir.join("segments.geojson");
    std::fs::write(&output_path, collection.to_string())?;

    logger::success(&format!(
        "{} segment(s) planned in {:.2?}, {:.1}% target coverage, EPSG:{}",
        result.segments.len(),
        elapsed,
        result.coverage_fraction * 100.0,
        result.epsg,
    ));
    logger::info(&format!(
        "candidates: {} generated, {} access-eligible, {} selected",
        result.diagnostics.candidates_generated,
        result.diagnostics.candidates_retained,
        result.diagnostics.candidates_selected,
    ));
    logger::success(&output_path.display().to_string());

    Ok(())
}

/// Bridges pipeline progress events to an optional indicatif bar.
struct CliProgressSink<'a> {
    bar: Option<&'a ProgressBar>,
}

impl ProgressSink for CliProgressSink<'_> {
    fn on_progress(&self, event: ProgressEvent<'_>) {
        if let Some(bar) = self.bar {
            bar.set_position((event.fraction * 100.0) as u64);
            bar.set_message(event.stage.to_string());
        } else {
            logger::debug(&format!("{}: {:.0}%", event.stage, event.fraction * 100.0));
        }
    }
}
