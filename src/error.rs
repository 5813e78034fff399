use thiserror::Error;

use crate::stack::Axis;

/// I/O errors that can occur when reading from a container's byte source
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from the operating system
    #[error("I/O error: {0}")]
    Io(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        IoError::Io(err.to_string())
    }
}

/// Errors raised while opening a container and decoding its metadata.
///
/// All variants abort processing of a single file only.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// File is too short or its signature does not match
    #[error("Not a LIF container: {reason}")]
    BadFormat { reason: String },

    /// Metadata block is malformed or lacks required fields
    #[error("Corrupt metadata: {reason}")]
    CorruptMetadata { reason: String },

    /// Declared payload extends past the end of the file
    #[error("Truncated payload: {reason}")]
    TruncatedPayload { reason: String },
}

impl DecodeError {
    pub(crate) fn bad_format(reason: impl Into<String>) -> Self {
        DecodeError::BadFormat {
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        DecodeError::CorruptMetadata {
            reason: reason.into(),
        }
    }

    pub(crate) fn truncated(reason: impl Into<String>) -> Self {
        DecodeError::TruncatedPayload {
            reason: reason.into(),
        }
    }
}

/// Errors raised while assembling frames from a series
#[derive(Debug, Clone, Error)]
pub enum AssemblerError {
    /// Requested index lies outside the axis extent
    #[error("Index out of range: {axis} index {index} (axis has {len} elements)")]
    IndexOutOfRange { axis: Axis, index: u32, len: u32 },

    /// Series index does not exist in the container
    #[error("Series not found: index {index} (container has {count} series)")]
    SeriesNotFound { index: usize, count: usize },

    /// I/O error while reading frame data
    #[error("Read error: {0}")]
    Read(#[from] IoError),
}

/// Errors raised by the projection engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// No frames were supplied for a reducing projection
    #[error("Cannot project an empty stack")]
    EmptyStack,

    /// Frames do not share width, height and sample type
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Reduction label is not one of the recognised kinds
    #[error("Unsupported reduction: {0}")]
    UnsupportedReduction(String),

    /// Every index of `axis` is iterated by the operation itself, so the
    /// request cannot also reduce along it
    #[error("Cannot reduce along {axis} while projecting every {axis} separately")]
    AxisConflict { axis: Axis },
}

/// Failure while streaming a frame stack into a projection
#[derive(Debug, Clone, Error)]
pub enum StackProjectionError {
    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Errors raised by an export adapter
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// Writing the output file failed
    #[error("Export to {path} failed: {message}")]
    ExportFailed { path: String, message: String },
}

/// Any failure of a single projection-and-export request.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<StackProjectionError> for PipelineError {
    fn from(err: StackProjectionError) -> Self {
        match err {
            StackProjectionError::Assembler(e) => PipelineError::Assembler(e),
            StackProjectionError::Projection(e) => PipelineError::Projection(e),
        }
    }
}
