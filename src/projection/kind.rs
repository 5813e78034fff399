//! Reduction kinds.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ProjectionError;

/// How a stack of frames is reduced to a single plane.
///
/// Kinds are parsed once at the configuration boundary; everything past it
/// works with this closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReductionKind {
    /// Elementwise maximum
    Max,
    /// Elementwise arithmetic mean, truncated
    Mean,
    /// Elementwise sum, clamped to the input type
    Sum,
    /// Elementwise population standard deviation, truncated
    StdDev,
    /// No reduction: the stack is passed through
    None,
}

impl ReductionKind {
    pub const ALL: [ReductionKind; 5] = [
        ReductionKind::Max,
        ReductionKind::Mean,
        ReductionKind::Sum,
        ReductionKind::StdDev,
        ReductionKind::None,
    ];

    /// User-facing label, as accepted by [`FromStr`].
    pub const fn label(self) -> &'static str {
        match self {
            ReductionKind::Max => "Max",
            ReductionKind::Mean => "Average",
            ReductionKind::Sum => "Sum",
            ReductionKind::StdDev => "Standard Deviation",
            ReductionKind::None => "None",
        }
    }

    /// Whether the kind collapses the stack into one plane.
    pub const fn reduces(self) -> bool {
        !matches!(self, ReductionKind::None)
    }
}

impl fmt::Display for ReductionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReductionKind {
    type Err = ProjectionError;

    /// Parse a case-normalised label.
    ///
    /// Accepts the labels returned by [`ReductionKind::label`] plus the
    /// short forms `Mean` and `StdDev`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Max" => Ok(ReductionKind::Max),
            "Average" | "Mean" => Ok(ReductionKind::Mean),
            "Sum" => Ok(ReductionKind::Sum),
            "Standard Deviation" | "StdDev" => Ok(ReductionKind::StdDev),
            "None" => Ok(ReductionKind::None),
            other => Err(ProjectionError::UnsupportedReduction(other.to_string())),
        }
    }
}
