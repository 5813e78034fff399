//! Lazy frame sequences over a container's series.

use crate::error::AssemblerError;
use crate::format::{Container, SeriesDescriptor};
use crate::io::RangeReader;

use super::frame::{Frame, PixelData};
use super::plan::{FrameCoord, FramePlan};

// =============================================================================
// Container Frame Access
// =============================================================================

impl<R: RangeReader> Container<R> {
    /// Plan a frame sequence over one series.
    ///
    /// Every index of the plan is checked against the series extents before
    /// anything is read. No I/O happens until the returned stack is iterated.
    ///
    /// # Errors
    /// - `SeriesNotFound` if `series_index` is past the last series
    /// - `IndexOutOfRange` if the plan names an index outside an axis
    pub fn frames(
        &self,
        series_index: usize,
        plan: &FramePlan,
    ) -> Result<FrameStack<'_, R>, AssemblerError> {
        let series = self.series_or_err(series_index)?;
        let coords = plan.resolve(&series.dims)?;

        Ok(FrameStack {
            container: self,
            series,
            coords,
        })
    }

    /// Read a single frame.
    pub async fn read_frame(
        &self,
        series_index: usize,
        coord: FrameCoord,
    ) -> Result<Frame, AssemblerError> {
        let series = self.series_or_err(series_index)?;
        series.check_coord(coord)?;
        read_frame_at(self.reader(), series, coord).await
    }

    fn series_or_err(&self, index: usize) -> Result<&SeriesDescriptor, AssemblerError> {
        self.series(index).ok_or(AssemblerError::SeriesNotFound {
            index,
            count: self.series_count(),
        })
    }
}

/// Read and decode the frame at an already validated coordinate.
async fn read_frame_at<R: RangeReader>(
    reader: &R,
    series: &SeriesDescriptor,
    coord: FrameCoord,
) -> Result<Frame, AssemblerError> {
    let offset = series.frame_offset(coord);
    let span = series.frame_span() as usize;
    let bytes = reader.read_exact_at(offset, span).await?;

    let data = PixelData::decode_plane(
        series.sample_type,
        &bytes,
        series.dims.x as usize,
        series.dims.y as usize,
        series.strides.x as usize,
        series.strides.y as usize,
    );

    Ok(Frame::new(series.dims.x, series.dims.y, coord, data))
}

// =============================================================================
// FrameStack
// =============================================================================

/// A finite, restartable sequence of frames from one series.
///
/// The stack only holds coordinates. Each [`cursor`](FrameStack::cursor)
/// starts again from the first frame and reads every frame from the
/// container on demand; frames are never cached.
pub struct FrameStack<'a, R: RangeReader> {
    container: &'a Container<R>,
    series: &'a SeriesDescriptor,
    coords: Vec<FrameCoord>,
}

impl<'a, R: RangeReader> FrameStack<'a, R> {
    pub fn series(&self) -> &SeriesDescriptor {
        self.series
    }

    /// Coordinates in iteration order.
    pub fn coords(&self) -> &[FrameCoord] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Start a new pass over the stack.
    pub fn cursor(&self) -> FrameCursor<'_, R> {
        FrameCursor {
            reader: self.container.reader(),
            series: self.series,
            coords: &self.coords,
            position: 0,
        }
    }

    /// Read every frame of the stack into memory.
    pub async fn collect(&self) -> Result<Vec<Frame>, AssemblerError> {
        let mut frames = Vec::with_capacity(self.len());
        let mut cursor = self.cursor();
        while let Some(frame) = cursor.next().await {
            frames.push(frame?);
        }
        Ok(frames)
    }
}

// =============================================================================
// FrameCursor
// =============================================================================

/// One pass over a [`FrameStack`].
pub struct FrameCursor<'s, R: RangeReader> {
    reader: &'s R,
    series: &'s SeriesDescriptor,
    coords: &'s [FrameCoord],
    position: usize,
}

impl<'s, R: RangeReader> FrameCursor<'s, R> {
    /// Read the next frame, or `None` once the stack is exhausted.
    pub async fn next(&mut self) -> Option<Result<Frame, AssemblerError>> {
        let coord = *self.coords.get(self.position)?;
        self.position += 1;
        Some(read_frame_at(self.reader, self.series, coord).await)
    }

    /// Number of frames already yielded.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.coords.len() - self.position
    }
}
