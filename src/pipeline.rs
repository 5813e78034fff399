//! End-to-end operations: open, project, export.
//!
//! Each call handles one file or one series. Failures are returned to the
//! caller, which decides whether to skip and continue; nothing here retries.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AssemblerError, DecodeError, PipelineError, ProjectionError};
use crate::export::{ExportAdapter, ExportMetadata};
use crate::format::{Container, SeriesDescriptor};
use crate::io::RangeReader;
use crate::projection::{project_stack, ProjectionRequest, ProjectionResult, ReductionKind};
use crate::stack::Axis;

/// Outcome of one exported projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionSummary {
    pub series_index: usize,
    pub series_name: String,
    pub kind: ReductionKind,

    /// Frames read from the container
    pub frames: usize,

    /// Planes written to the output
    pub planes: usize,

    pub width: u32,
    pub height: u32,
    pub path: PathBuf,
}

/// Open a local container and return its series in declaration order.
pub async fn open_and_list(path: impl AsRef<Path>) -> Result<Vec<SeriesDescriptor>, DecodeError> {
    let container = Container::open_path(path).await?;
    Ok(container.list_series().to_vec())
}

/// Project one series as described by `request`.
///
/// Returns the result and the number of frames read.
pub async fn project_series<R: RangeReader>(
    container: &Container<R>,
    series_index: usize,
    request: &ProjectionRequest,
) -> Result<(ProjectionResult, usize), PipelineError> {
    let stack = container.frames(series_index, &request.plan())?;
    let frames = stack.len();

    debug!(
        series = series_index,
        axis = %request.axis,
        frames,
        kind = %request.kind,
        "projecting series"
    );

    let result = project_stack(&stack, request.kind).await?;
    Ok((result, frames))
}

/// Project every channel of one series with the same request and merge the
/// results into one multi-channel result.
///
/// The request's fixed channel is ignored. A request along the channel axis
/// fails with `AxisConflict`; an unreduced stack ([`ReductionKind::None`]) of
/// more than one frame per channel fails with `ShapeMismatch`.
pub async fn project_all_channels<R: RangeReader>(
    container: &Container<R>,
    series_index: usize,
    request: &ProjectionRequest,
) -> Result<(ProjectionResult, usize), PipelineError> {
    if request.axis == Axis::Channel {
        return Err(ProjectionError::AxisConflict {
            axis: Axis::Channel,
        }
        .into());
    }
    let channels = series_of(container, series_index)?.dims.channels;

    let mut results = Vec::with_capacity(channels as usize);
    let mut frames = 0;
    for channel in 0..channels {
        let request = request.clone().with_fixed(Axis::Channel, channel);
        let (result, read) = project_series(container, series_index, &request).await?;
        frames += read;
        results.push(result);
    }

    Ok((ProjectionResult::merge_channels(results)?, frames))
}

/// Project one series and hand the result to `adapter`.
pub async fn export_projection<R: RangeReader>(
    container: &Container<R>,
    series_index: usize,
    request: &ProjectionRequest,
    path: &Path,
    adapter: &dyn ExportAdapter,
) -> Result<ProjectionSummary, PipelineError> {
    let (result, frames) = project_series(container, series_index, request).await?;
    let channels = if request.axis == Axis::Channel {
        stacked_channels(container, series_index, request)?
    } else {
        vec![request.fixed(Axis::Channel)]
    };
    let series = series_of(container, series_index)?;
    let metadata = ExportMetadata::for_series(series, &channels, request.axis);
    write_result(series, &metadata, result, frames, path, adapter)
}

/// Like [`export_projection`], projecting every channel into one output.
pub async fn export_all_channels<R: RangeReader>(
    container: &Container<R>,
    series_index: usize,
    request: &ProjectionRequest,
    path: &Path,
    adapter: &dyn ExportAdapter,
) -> Result<ProjectionSummary, PipelineError> {
    let (result, frames) = project_all_channels(container, series_index, request).await?;
    let channels: Vec<u32> = (0..result.planes.len() as u32).collect();
    let series = series_of(container, series_index)?;
    let metadata = ExportMetadata::for_series(series, &channels, request.axis);
    write_result(series, &metadata, result, frames, path, adapter)
}

fn series_of<R: RangeReader>(
    container: &Container<R>,
    index: usize,
) -> Result<&SeriesDescriptor, AssemblerError> {
    container.series(index).ok_or(AssemblerError::SeriesNotFound {
        index,
        count: container.series_count(),
    })
}

/// Channels visited when projecting along the channel axis.
fn stacked_channels<R: RangeReader>(
    container: &Container<R>,
    series_index: usize,
    request: &ProjectionRequest,
) -> Result<Vec<u32>, PipelineError> {
    let stack = container.frames(series_index, &request.plan())?;
    Ok(stack.coords().iter().map(|c| c.channel).collect())
}

fn write_result(
    series: &SeriesDescriptor,
    metadata: &ExportMetadata,
    result: ProjectionResult,
    frames: usize,
    path: &Path,
    adapter: &dyn ExportAdapter,
) -> Result<ProjectionSummary, PipelineError> {
    adapter.export(&result, metadata, path)?;

    info!(
        series = %series.name,
        kind = %result.kind,
        frames,
        path = %path.display(),
        "exported projection"
    );

    Ok(ProjectionSummary {
        series_index: series.index,
        series_name: series.name.clone(),
        kind: result.kind,
        frames,
        planes: result.planes.len(),
        width: result.width,
        height: result.height,
        path: path.to_path_buf(),
    })
}
