//! Streaming reduction of frame stacks.
//!
//! Reductions keep exact integer accumulators and only convert to floating
//! point once, when the result is produced:
//!
//! | Kind     | Accumulator              | Output                               |
//! |----------|--------------------------|--------------------------------------|
//! | Max      | input type               | maximum                              |
//! | Sum      | `u64` sum                | clamped to the input type's maximum  |
//! | Mean     | `u64` sum                | `sum / n`, truncated                 |
//! | StdDev   | `u64` sum and sum of sq. | `sqrt((n·Σx² − (Σx)²) / n²)`, truncated |
//!
//! Streaming a stack therefore yields exactly what reducing the whole batch
//! at once would, and memory stays at one frame plus the accumulators.

use tracing::debug;

use crate::error::{ProjectionError, StackProjectionError};
use crate::io::RangeReader;
use crate::stack::{Frame, FrameStack, PixelData, SampleType};

use super::kind::ReductionKind;
use super::result::{AxisTag, ProjectionResult};

// =============================================================================
// Projector
// =============================================================================

#[derive(Debug)]
enum Accumulator {
    Max(Vec<u16>),
    Sum(Vec<u64>),
    Moments { sum: Vec<u64>, sum_sq: Vec<u64> },
    Stack(Vec<PixelData>),
}

/// Shape shared by every frame of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Shape {
    width: u32,
    height: u32,
    sample_type: SampleType,
}

impl Shape {
    fn of(frame: &Frame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            sample_type: frame.sample_type(),
        }
    }

    fn description(&self) -> String {
        format!("{}x{} {}", self.width, self.height, self.sample_type.name())
    }
}

/// Incremental reducer.
///
/// Push frames one at a time, then call [`finish`](Projector::finish). The
/// first frame fixes the shape every later frame must match.
#[derive(Debug)]
pub struct Projector {
    kind: ReductionKind,
    shape: Option<Shape>,
    count: u64,
    acc: Accumulator,
}

impl Projector {
    pub fn new(kind: ReductionKind) -> Self {
        let acc = match kind {
            ReductionKind::Max => Accumulator::Max(Vec::new()),
            ReductionKind::Sum | ReductionKind::Mean => Accumulator::Sum(Vec::new()),
            ReductionKind::StdDev => Accumulator::Moments {
                sum: Vec::new(),
                sum_sq: Vec::new(),
            },
            ReductionKind::None => Accumulator::Stack(Vec::new()),
        };

        Self {
            kind,
            shape: None,
            count: 0,
            acc,
        }
    }

    pub fn kind(&self) -> ReductionKind {
        self.kind
    }

    /// Number of frames pushed so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Add one frame to the reduction.
    ///
    /// # Errors
    /// `ShapeMismatch` if the frame's width, height or sample type differs
    /// from the first frame. The projector is left unchanged in that case.
    pub fn push(&mut self, frame: Frame) -> Result<(), ProjectionError> {
        if frame.data.len() != frame.pixel_count() {
            return Err(ProjectionError::ShapeMismatch {
                expected: format!("{} samples", frame.pixel_count()),
                actual: format!("{} samples", frame.data.len()),
            });
        }

        let shape = Shape::of(&frame);
        match self.shape {
            Some(expected) if expected != shape => {
                return Err(ProjectionError::ShapeMismatch {
                    expected: expected.description(),
                    actual: frame.shape_description(),
                });
            }
            Some(_) => {}
            None => {
                self.shape = Some(shape);
                self.init(frame.pixel_count());
            }
        }

        match &mut self.acc {
            Accumulator::Max(max) => {
                for (m, v) in max.iter_mut().zip(frame.data.iter_wide()) {
                    *m = (*m).max(v as u16);
                }
            }
            Accumulator::Sum(sum) => {
                for (s, v) in sum.iter_mut().zip(frame.data.iter_wide()) {
                    *s += v;
                }
            }
            Accumulator::Moments { sum, sum_sq } => {
                let samples = frame.data.iter_wide();
                for ((s, q), v) in sum.iter_mut().zip(sum_sq.iter_mut()).zip(samples) {
                    *s += v;
                    *q += v * v;
                }
            }
            Accumulator::Stack(planes) => planes.push(frame.data),
        }

        self.count += 1;
        Ok(())
    }

    fn init(&mut self, pixels: usize) {
        match &mut self.acc {
            Accumulator::Max(max) => max.resize(pixels, 0),
            Accumulator::Sum(sum) => sum.resize(pixels, 0),
            Accumulator::Moments { sum, sum_sq } => {
                sum.resize(pixels, 0);
                sum_sq.resize(pixels, 0);
            }
            Accumulator::Stack(_) => {}
        }
    }

    /// Produce the result.
    ///
    /// # Errors
    /// `EmptyStack` if no frame was pushed.
    pub fn finish(self) -> Result<ProjectionResult, ProjectionError> {
        let shape = self.shape.ok_or(ProjectionError::EmptyStack)?;
        let kind = self.kind;
        let n = self.count;
        let st = shape.sample_type;

        let (planes, axes) = match self.acc {
            Accumulator::Max(max) => (
                vec![PixelData::from_wide_saturating(st, max.into_iter().map(u64::from))],
                AxisTag::YX,
            ),
            Accumulator::Sum(sum) if kind == ReductionKind::Mean => (
                vec![PixelData::from_wide_saturating(
                    st,
                    sum.into_iter().map(|s| mean(s, n)),
                )],
                AxisTag::YX,
            ),
            Accumulator::Sum(sum) => (
                vec![PixelData::from_wide_saturating(st, sum.into_iter())],
                AxisTag::YX,
            ),
            Accumulator::Moments { sum, sum_sq } => (
                vec![PixelData::from_wide_saturating(
                    st,
                    sum.into_iter()
                        .zip(sum_sq)
                        .map(|(s, q)| std_dev(s, q, n)),
                )],
                AxisTag::YX,
            ),
            Accumulator::Stack(planes) => (planes, AxisTag::ZYX),
        };

        debug!(
            kind = %kind,
            frames = n,
            width = shape.width,
            height = shape.height,
            "projected stack"
        );

        Ok(ProjectionResult {
            width: shape.width,
            height: shape.height,
            sample_type: st,
            planes,
            kind,
            axes,
        })
    }
}

/// Arithmetic mean, truncated toward zero.
fn mean(sum: u64, n: u64) -> u64 {
    sum / n
}

/// Population standard deviation from exact moments, truncated toward zero.
fn std_dev(sum: u64, sum_sq: u64, n: u64) -> u64 {
    let n = n as u128;
    let numerator = (n * sum_sq as u128).saturating_sub((sum as u128) * (sum as u128));
    let variance = numerator as f64 / (n * n) as f64;
    variance.sqrt() as u64
}

// =============================================================================
// Entry Points
// =============================================================================

/// Reduce a batch of frames.
pub fn project(frames: &[Frame], kind: ReductionKind) -> Result<ProjectionResult, ProjectionError> {
    let mut projector = Projector::new(kind);
    for frame in frames {
        projector.push(frame.clone())?;
    }
    projector.finish()
}

/// Reduce a frame stack, reading one frame at a time.
pub async fn project_stack<R: RangeReader>(
    stack: &FrameStack<'_, R>,
    kind: ReductionKind,
) -> Result<ProjectionResult, StackProjectionError> {
    let mut projector = Projector::new(kind);
    let mut cursor = stack.cursor();
    while let Some(frame) = cursor.next().await {
        projector.push(frame?)?;
    }
    Ok(projector.finish()?)
}
