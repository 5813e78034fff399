//! Configuration management for LIF Projector.
//!
//! Options come from command-line arguments via clap, with an environment
//! variable (`LIF_` prefix) for every option and defaults for everything
//! optional.
//!
//! # Example
//!
//! ```ignore
//! use lif_projector::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::List(config) => println!("{} file(s)", config.files.len()),
//!     Command::Project(config) => println!("writing to {}", config.output.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `LIF_OUTPUT` - Output directory for `project`
//! - `LIF_PROJECTION` - Reduction label (default: Max)
//! - `LIF_AXIS` - Axis to project along (default: z)
//! - `LIF_SERIES` - Comma-separated series indices (default: all)
//! - `LIF_CHANNEL` - Channel to project (default: 0)
//! - `LIF_ALL_CHANNELS` - Project every channel into one file
//! - `LIF_Z`, `LIF_TIME`, `LIF_TILE` - Indices held for non-projected axes
//! - `LIF_FRAMES` - Comma-separated subset of indices along the projected axis
//! - `LIF_JSON` - Print `list` output as JSON

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::projection::{ProjectionRequest, ReductionKind};
use crate::stack::Axis;

// =============================================================================
// Default Values
// =============================================================================

/// Default reduction label.
pub const DEFAULT_PROJECTION: &str = "Max";

/// Default projected axis.
pub const DEFAULT_AXIS: AxisArg = AxisArg::Z;

// =============================================================================
// CLI Arguments
// =============================================================================

/// LIF Projector - projections of Leica LIF image series.
///
/// Lists the series of `.lif` containers and writes Max, Average, Sum,
/// Standard Deviation or unreduced projections of them as OME-TIFF.
#[derive(Parser, Debug, Clone)]
#[command(name = "lif-projector")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the image series of one or more containers.
    List(ListConfig),

    /// Project image series and export them as OME-TIFF.
    Project(ProjectConfig),
}

/// Axis accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisArg {
    Z,
    #[value(alias = "time")]
    T,
    #[value(alias = "c")]
    Channel,
    Tile,
}

impl From<AxisArg> for Axis {
    fn from(arg: AxisArg) -> Self {
        match arg {
            AxisArg::Z => Axis::Z,
            AxisArg::T => Axis::Time,
            AxisArg::Channel => Axis::Channel,
            AxisArg::Tile => Axis::Tile,
        }
    }
}

// =============================================================================
// List Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ListConfig {
    /// LIF files to inspect.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Print one JSON document per file instead of a table.
    #[arg(long, default_value_t = false, env = "LIF_JSON")]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ListConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_files(&self.files)
    }
}

// =============================================================================
// Project Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ProjectConfig {
    /// LIF files to project.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Directory receiving `<series name>.ome.tiff` files.
    #[arg(short, long, env = "LIF_OUTPUT")]
    pub output: PathBuf,

    /// Reduction: Max, Average, Sum, Standard Deviation or None.
    ///
    /// Case-insensitive.
    #[arg(short, long, default_value = DEFAULT_PROJECTION, env = "LIF_PROJECTION")]
    pub projection: String,

    /// Axis to project along.
    #[arg(short, long, value_enum, default_value_t = DEFAULT_AXIS, env = "LIF_AXIS")]
    pub axis: AxisArg,

    /// Series indices to project (default: all).
    #[arg(short, long, value_delimiter = ',', env = "LIF_SERIES")]
    pub series: Vec<usize>,

    /// Channel to project.
    #[arg(short, long, env = "LIF_CHANNEL")]
    pub channel: Option<u32>,

    /// Project every channel and write them into one multi-channel file.
    #[arg(long, default_value_t = false, env = "LIF_ALL_CHANNELS")]
    pub all_channels: bool,

    /// Z index held when not projecting along Z.
    #[arg(long, env = "LIF_Z")]
    pub z: Option<u32>,

    /// Time index held when not projecting along time.
    #[arg(long, env = "LIF_TIME")]
    pub time: Option<u32>,

    /// Tile index held when not projecting along tiles.
    #[arg(long, env = "LIF_TILE")]
    pub tile: Option<u32>,

    /// Only these indices along the projected axis (default: all).
    #[arg(long, value_delimiter = ',', env = "LIF_FRAMES")]
    pub frames: Option<Vec<u32>>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ProjectConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_files(&self.files)?;

        if self.output.as_os_str().is_empty() {
            return Err("Output directory is required. Set --output or LIF_OUTPUT".to_string());
        }
        if self.output.is_file() {
            return Err(format!(
                "Output path {} is a file, expected a directory",
                self.output.display()
            ));
        }

        let kind = self.reduction()?;
        let axis = Axis::from(self.axis);

        if self.all_channels {
            if self.channel.is_some() {
                return Err("--channel and --all-channels cannot be combined".to_string());
            }
            if axis == Axis::Channel {
                return Err("--all-channels cannot be combined with --axis channel".to_string());
            }
            if kind == ReductionKind::None {
                return Err("--all-channels requires a reducing projection".to_string());
            }
        }

        for (held, value) in [
            (Axis::Z, self.z),
            (Axis::Time, self.time),
            (Axis::Channel, self.channel),
            (Axis::Tile, self.tile),
        ] {
            if held == axis && value.is_some() {
                return Err(format!(
                    "Cannot hold the {} axis at a fixed index while projecting along it",
                    held
                ));
            }
        }

        if matches!(&self.frames, Some(frames) if frames.is_empty()) {
            return Err("--frames must name at least one index".to_string());
        }

        Ok(())
    }

    /// Parsed reduction kind.
    pub fn reduction(&self) -> Result<ReductionKind, String> {
        normalize_label(&self.projection)
            .parse()
            .map_err(|e| format!("{}. Expected one of: {}", e, reduction_labels()))
    }

    /// The projection request described by the options.
    pub fn request(&self) -> Result<ProjectionRequest, String> {
        let mut request = ProjectionRequest::new(self.reduction()?)
            .along(self.axis.into())
            .with_fixed(Axis::Z, self.z.unwrap_or(0))
            .with_fixed(Axis::Time, self.time.unwrap_or(0))
            .with_fixed(Axis::Channel, self.channel.unwrap_or(0))
            .with_fixed(Axis::Tile, self.tile.unwrap_or(0));

        if let Some(ref frames) = self.frames {
            request = request.with_indices(frames.clone());
        }

        Ok(request)
    }

    /// Whether `index` was selected with `--series` (all when none given).
    pub fn wants_series(&self, index: usize) -> bool {
        self.series.is_empty() || self.series.contains(&index)
    }
}

fn validate_files(files: &[PathBuf]) -> Result<(), String> {
    if files.is_empty() {
        return Err("At least one input file is required".to_string());
    }
    Ok(())
}

/// Case-normalise a reduction label: `standard deviation` → `Standard Deviation`.
pub fn normalize_label(label: &str) -> String {
    let words: Vec<String> = label
        .split_whitespace()
        .map(|word| {
            if word.eq_ignore_ascii_case("stddev") {
                return "StdDev".to_string();
            }
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    words.join(" ")
}

fn reduction_labels() -> String {
    ReductionKind::ALL
        .iter()
        .map(|k| k.label())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Tests
// =============================================================================
