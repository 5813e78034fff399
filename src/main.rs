//! LIF Projector - projections of Leica LIF image series.
//!
//! This binary parses the command line, configures logging and runs the
//! `list` or `project` command over every input file.

use clap::Parser;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lif_projector::{
    config::{Cli, Command, ListConfig, ProjectConfig},
    export::{ExportAdapter, OmeTiffExporter},
    format::{Container, SeriesDescriptor},
    pipeline::{export_all_channels, export_projection, open_and_list},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::List(config) => run_list(config).await,
        Command::Project(config) => run_project(config).await,
    }
}

// =============================================================================
// List Command
// =============================================================================

async fn run_list(config: ListConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let mut failures = 0;

    for path in &config.files {
        let series = match open_and_list(path).await {
            Ok(series) => series,
            Err(e) => {
                error!("{}: {}", path.display(), e);
                failures += 1;
                continue;
            }
        };

        if config.json {
            let json = serde_json::json!({
                "file": path.display().to_string(),
                "series": series,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    error!("{}: could not serialize series: {}", path.display(), e);
                    failures += 1;
                }
            }
        } else {
            print_series_table(path, &series);
        }
    }

    exit_code(failures)
}

/// Print one line per series.
fn print_series_table(path: &Path, series: &[SeriesDescriptor]) {
    println!("{}", path.display());
    println!("═══════════════════════════════════════════════════════════════");

    if series.is_empty() {
        println!("  (no image series)");
    }

    for s in series {
        let d = &s.dims;
        println!(
            "  [{}] {}  {}x{}  z={} t={} c={} m={}  {}-bit {}  {:.2} MB",
            s.index,
            display_name(s),
            d.x,
            d.y,
            d.z,
            d.t,
            d.channels,
            d.tiles,
            s.bit_depth,
            s.sample_type.name(),
            s.size_mb()
        );
    }

    println!();
}

fn display_name(series: &SeriesDescriptor) -> String {
    match (series.path.is_empty(), series.name.is_empty()) {
        (_, true) => "(unnamed)".to_string(),
        (true, false) => series.name.clone(),
        (false, false) => format!("{}/{}", series.path, series.name),
    }
}

// =============================================================================
// Project Command
// =============================================================================

async fn run_project(config: ProjectConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let request = match config.request() {
        Ok(request) => request,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::fs::create_dir_all(&config.output).await {
        error!("Cannot create {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    info!(
        "Projection: {} along {}, output: {}",
        request.kind,
        request.axis,
        config.output.display()
    );

    let exporter = OmeTiffExporter::new();
    let mut used_names = HashSet::new();
    let mut exported = 0;
    let mut failures = 0;

    for file in &config.files {
        let container = match Container::open_path(file).await {
            Ok(container) => container,
            Err(e) => {
                error!("{}: {}", file.display(), e);
                failures += 1;
                continue;
            }
        };

        for series in container.list_series() {
            if !config.wants_series(series.index) {
                continue;
            }

            let output = output_path(&config.output, series, exporter.extension(), &mut used_names);
            let outcome = if config.all_channels {
                export_all_channels(&container, series.index, &request, &output, &exporter).await
            } else {
                export_projection(&container, series.index, &request, &output, &exporter).await
            };

            match outcome {
                Ok(summary) => {
                    info!(
                        "{} [{}] {} → {} ({} frames)",
                        file.display(),
                        summary.series_index,
                        summary.series_name,
                        summary.path.display(),
                        summary.frames
                    );
                    exported += 1;
                }
                Err(e) => {
                    error!("{} [{}] {}: {}", file.display(), series.index, series.name, e);
                    failures += 1;
                }
            }
        }

        for index in &config.series {
            if *index >= container.series_count() {
                warn!(
                    "{}: series {} requested but the file has {}",
                    file.display(),
                    index,
                    container.series_count()
                );
            }
        }
    }

    info!("Exported {} series, {} failure(s)", exported, failures);
    exit_code(failures)
}

/// `<output>/<series name>.<extension>`, suffixed with the series index when
/// the name is empty or already taken.
fn output_path(
    dir: &Path,
    series: &SeriesDescriptor,
    extension: &str,
    used: &mut HashSet<String>,
) -> PathBuf {
    let base = sanitize(&series.name);
    let mut stem = if base.is_empty() {
        format!("series_{}", series.index)
    } else {
        base.clone()
    };

    if used.contains(&stem) {
        stem = format!("{}_{}", base, series.index);
    }
    let mut suffix = 1;
    while used.contains(&stem) {
        stem = format!("{}_{}_{}", base, series.index, suffix);
        suffix += 1;
    }

    used.insert(stem.clone());
    dir.join(format!("{}.{}", stem, extension))
}

/// Replace characters that are not safe in file names.
fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn exit_code(failures: usize) -> ExitCode {
    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "lif_projector=debug"
    } else {
        "lif_projector=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
