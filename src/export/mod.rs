//! Export of projection results.
//!
//! The pipeline hands every [`ProjectionResult`] to an [`ExportAdapter`]
//! together with descriptive [`ExportMetadata`]. [`OmeTiffExporter`] is the
//! bundled adapter; callers may supply their own.

mod ome_tiff;

pub use ome_tiff::{ome_xml, OmeTiffExporter};

use std::path::Path;

use crate::error::ExportError;
use crate::format::{PhysicalSizes, SeriesDescriptor};
use crate::projection::ProjectionResult;
use crate::stack::Axis;

/// Writes a projection result to a file.
pub trait ExportAdapter: Send + Sync {
    /// Write `result` to `path`.
    ///
    /// On failure no partial output is left behind.
    fn export(
        &self,
        result: &ProjectionResult,
        metadata: &ExportMetadata,
        path: &Path,
    ) -> Result<(), ExportError>;

    /// File extension written by this adapter, without the leading dot.
    fn extension(&self) -> &'static str;
}

/// Descriptive metadata accompanying an exported result.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMetadata {
    /// Image name
    pub name: String,

    /// Physical pixel sizes in micrometres
    pub physical_sizes: PhysicalSizes,

    /// One name per output plane for channel results, otherwise one entry
    pub channel_names: Vec<String>,

    /// Axis an unreduced stack runs along
    pub stack_axis: Axis,

    /// Declared significant bits of the source
    pub bit_depth: u32,
}

impl ExportMetadata {
    /// Metadata for a result projected from `series`.
    ///
    /// `channels` lists the source channels in output order.
    pub fn for_series(series: &SeriesDescriptor, channels: &[u32], stack_axis: Axis) -> Self {
        Self {
            name: series.name.clone(),
            physical_sizes: series.physical_sizes,
            channel_names: channels.iter().map(|&c| series.channel_label(c)).collect(),
            stack_axis,
            bit_depth: series.bit_depth,
        }
    }
}
