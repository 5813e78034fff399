//! Projection results.

use serde::Serialize;

use crate::error::ProjectionError;
use crate::stack::{PixelData, SampleType};

use super::kind::ReductionKind;

/// Meaning of the planes of a [`ProjectionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AxisTag {
    /// One reduced plane
    YX,
    /// One reduced plane per channel
    YXC,
    /// The unreduced stack, one plane per input frame
    ZYX,
}

impl AxisTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            AxisTag::YX => "YX",
            AxisTag::YXC => "YXC",
            AxisTag::ZYX => "ZYX",
        }
    }
}

/// Output of the projection engine.
///
/// All planes share `width`, `height` and `sample_type` and are stored row
/// by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionResult {
    pub width: u32,
    pub height: u32,
    pub sample_type: SampleType,
    pub planes: Vec<PixelData>,
    pub kind: ReductionKind,
    pub axes: AxisTag,
}

impl ProjectionResult {
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Sample at column `x`, row `y` of plane `plane`.
    pub fn get(&self, plane: usize, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.planes
            .get(plane)?
            .get(y as usize * self.width as usize + x as usize)
    }

    /// Stack single-plane results of one series, one per channel, into a
    /// channel-interleaved result.
    ///
    /// # Errors
    /// - `EmptyStack` if `results` is empty
    /// - `ShapeMismatch` if a result holds more than one plane or its shape
    ///   differs from the first
    pub fn merge_channels(results: Vec<ProjectionResult>) -> Result<Self, ProjectionError> {
        let mut results = results.into_iter();
        let first = results.next().ok_or(ProjectionError::EmptyStack)?;
        first.check_single_plane()?;

        let mut merged = ProjectionResult {
            axes: AxisTag::YXC,
            ..first
        };

        for result in results {
            result.check_single_plane()?;
            if (result.width, result.height, result.sample_type)
                != (merged.width, merged.height, merged.sample_type)
            {
                return Err(ProjectionError::ShapeMismatch {
                    expected: merged.shape_description(),
                    actual: result.shape_description(),
                });
            }
            merged.planes.extend(result.planes);
        }

        Ok(merged)
    }

    fn check_single_plane(&self) -> Result<(), ProjectionError> {
        if self.planes.len() == 1 {
            Ok(())
        } else {
            Err(ProjectionError::ShapeMismatch {
                expected: format!("{} with 1 plane", self.shape_description()),
                actual: format!("{} planes", self.planes.len()),
            })
        }
    }

    pub(crate) fn shape_description(&self) -> String {
        format!("{}x{} {}", self.width, self.height, self.sample_type.name())
    }
}
