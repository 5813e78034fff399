//! Frame planning: which frames of a series to visit, and in what order.

use std::fmt;

use serde::Serialize;

use crate::error::AssemblerError;
use crate::format::Dimensions;

// =============================================================================
// Axis
// =============================================================================

/// A non-spatial axis of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Z,
    Time,
    Channel,
    Tile,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::Z, Axis::Time, Axis::Channel, Axis::Tile];

    pub const fn name(self) -> &'static str {
        match self {
            Axis::Z => "Z",
            Axis::Time => "Time",
            Axis::Channel => "Channel",
            Axis::Tile => "Tile",
        }
    }

    pub(crate) const fn slot(self) -> usize {
        match self {
            Axis::Z => 0,
            Axis::Time => 1,
            Axis::Channel => 2,
            Axis::Tile => 3,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// FrameCoord
// =============================================================================

/// Position of one frame along every non-spatial axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct FrameCoord {
    pub z: u32,
    pub t: u32,
    pub channel: u32,
    pub tile: u32,
}

impl FrameCoord {
    pub fn new(z: u32, t: u32, channel: u32, tile: u32) -> Self {
        Self { z, t, channel, tile }
    }

    pub fn get(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Z => self.z,
            Axis::Time => self.t,
            Axis::Channel => self.channel,
            Axis::Tile => self.tile,
        }
    }

    pub fn with(mut self, axis: Axis, index: u32) -> Self {
        match axis {
            Axis::Z => self.z = index,
            Axis::Time => self.t = index,
            Axis::Channel => self.channel = index,
            Axis::Tile => self.tile = index,
        }
        self
    }
}

// =============================================================================
// FramePlan
// =============================================================================

/// Selection of indices along one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisSelection {
    /// Hold the axis at one index
    Fixed(u32),
    /// Visit every index in ascending order
    All,
    /// Visit exactly these indices, in this order
    Indices(Vec<u32>),
}

/// Which frames of a series to visit, and their nesting order.
///
/// The default plan iterates Time and holds Z, Channel and Tile at index 0.
/// Nesting lists every axis from outermost to innermost; it only matters when
/// more than one axis is iterated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    selections: [AxisSelection; 4],
    nesting: [Axis; 4],
}

/// Outer to inner.
const DEFAULT_NESTING: [Axis; 4] = [Axis::Tile, Axis::Channel, Axis::Time, Axis::Z];

impl Default for FramePlan {
    fn default() -> Self {
        Self::along(Axis::Time)
    }
}

impl FramePlan {
    /// Iterate `axis` fully, holding every other axis at index 0.
    pub fn along(axis: Axis) -> Self {
        let mut selections = [
            AxisSelection::Fixed(0),
            AxisSelection::Fixed(0),
            AxisSelection::Fixed(0),
            AxisSelection::Fixed(0),
        ];
        selections[axis.slot()] = AxisSelection::All;

        Self {
            selections,
            nesting: DEFAULT_NESTING,
        }
    }

    /// Hold `axis` at `index`.
    pub fn with_fixed(mut self, axis: Axis, index: u32) -> Self {
        self.selections[axis.slot()] = AxisSelection::Fixed(index);
        self
    }

    /// Iterate every index of `axis`.
    pub fn with_all(mut self, axis: Axis) -> Self {
        self.selections[axis.slot()] = AxisSelection::All;
        self
    }

    /// Visit exactly `indices` along `axis`.
    pub fn with_indices(mut self, axis: Axis, indices: Vec<u32>) -> Self {
        self.selections[axis.slot()] = AxisSelection::Indices(indices);
        self
    }

    /// Change the nesting order (outer to inner).
    ///
    /// Returns `None` unless `order` names every axis exactly once.
    pub fn with_nesting(mut self, order: [Axis; 4]) -> Option<Self> {
        let mut seen = [false; 4];
        for axis in order {
            if std::mem::replace(&mut seen[axis.slot()], true) {
                return None;
            }
        }
        self.nesting = order;
        Some(self)
    }

    pub fn selection(&self, axis: Axis) -> &AxisSelection {
        &self.selections[axis.slot()]
    }

    pub fn nesting(&self) -> [Axis; 4] {
        self.nesting
    }

    /// Resolve the plan against a series' extents.
    ///
    /// Every index is checked up front; nothing is clamped.
    pub fn resolve(&self, dims: &Dimensions) -> Result<Vec<FrameCoord>, AssemblerError> {
        let mut lists: [Vec<u32>; 4] = Default::default();

        for axis in Axis::ALL {
            let len = dims.axis_len(axis);
            let indices = match self.selection(axis) {
                AxisSelection::Fixed(index) => vec![*index],
                AxisSelection::All => (0..len).collect(),
                AxisSelection::Indices(indices) => indices.clone(),
            };

            if let Some(&index) = indices.iter().find(|&&i| i >= len) {
                return Err(AssemblerError::IndexOutOfRange { axis, index, len });
            }

            lists[axis.slot()] = indices;
        }

        let mut coords = vec![FrameCoord::default()];
        for axis in self.nesting {
            let indices = &lists[axis.slot()];
            coords = coords
                .into_iter()
                .flat_map(|coord| indices.iter().map(move |&i| coord.with(axis, i)))
                .collect();
        }

        Ok(coords)
    }
}
