//! # LIF Projector
//!
//! Decoding of Leica LIF microscopy containers and 2D projections of their
//! image series.
//!
//! A LIF file holds many independent image series, each with up to four
//! non-spatial axes (Z, Time, Channel, Tile) on top of X/Y. This library
//! opens a container without loading pixel payloads, assembles ordered
//! stacks of 2D frames on demand and reduces them to a single plane.
//!
//! ## Features
//!
//! - **Lazy decoding**: Opening reads only the header, the XML metadata and the memory block directory
//! - **Exact reductions**: Max, Average, Sum, Standard Deviation and pass-through, streamed one frame at a time
//! - **8 and 16-bit data**: Integer accumulators, no overflow or drift
//! - **OME-TIFF export**: Pluggable export adapters with an OME-TIFF writer included
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`io`] - Positional byte sources (local files, memory)
//! - [`mod@format`] - LIF container decoder
//! - [`stack`] - Frame planning and lazy frame stacks
//! - [`projection`] - Reduction kinds and the projection engine
//! - [`export`] - Export adapters
//! - [`pipeline`] - Open, project and export in one call
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use lif_projector::{Container, OmeTiffExporter, ProjectionRequest, ReductionKind};
//! use lif_projector::pipeline::export_projection;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let container = Container::open_path("experiment.lif").await?;
//!     for series in container.list_series() {
//!         println!("{}: {}x{}", series.name, series.dims.x, series.dims.y);
//!     }
//!
//!     let request = ProjectionRequest::new(ReductionKind::Max);
//!     export_projection(&container, 0, &request, Path::new("max.ome.tiff"), &OmeTiffExporter::new())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod io;
pub mod pipeline;
pub mod projection;
pub mod stack;

// Re-export commonly used types
pub use config::{AxisArg, Cli, Command, ListConfig, ProjectConfig};
pub use error::{
    AssemblerError, DecodeError, ExportError, IoError, PipelineError, ProjectionError,
    StackProjectionError,
};
pub use export::{ExportAdapter, ExportMetadata, OmeTiffExporter};
pub use format::{
    is_lif_header, ChannelInfo, Container, Dimensions, LifVersion, Payload, PhysicalSizes,
    SeriesDescriptor, Strides,
};
pub use io::{FileRangeReader, MemoryRangeReader, RangeReader};
pub use pipeline::{export_projection, open_and_list, ProjectionSummary};
pub use projection::{
    project, project_stack, AxisTag, ProjectionRequest, ProjectionResult, Projector,
    ReductionKind,
};
pub use stack::{
    Axis, AxisSelection, Frame, FrameCoord, FrameCursor, FramePlan, FrameStack, PixelData,
    SampleType,
};
