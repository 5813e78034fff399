//! Projection requests.

use crate::stack::{Axis, FramePlan};

use super::kind::ReductionKind;

/// What to project and how.
///
/// A request reduces one axis of a series (Z by default). The other axes are
/// held at fixed indices, 0 unless set with [`with_fixed`](Self::with_fixed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionRequest {
    pub kind: ReductionKind,
    pub axis: Axis,

    /// Explicit subset of indices along `axis`; all indices when `None`
    pub indices: Option<Vec<u32>>,

    fixed: [u32; 4],
}

impl ProjectionRequest {
    pub fn new(kind: ReductionKind) -> Self {
        Self {
            kind,
            axis: Axis::Z,
            indices: None,
            fixed: [0; 4],
        }
    }

    /// Reduce along `axis` instead of Z.
    pub fn along(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    /// Only visit `indices` along the projected axis, in this order.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Hold `axis` at `index`. Ignored for the projected axis.
    pub fn with_fixed(mut self, axis: Axis, index: u32) -> Self {
        self.fixed[axis.slot()] = index;
        self
    }

    /// Index at which `axis` is held when it is not projected.
    pub fn fixed(&self, axis: Axis) -> u32 {
        self.fixed[axis.slot()]
    }

    /// The frame plan visiting exactly the frames this request reduces.
    pub fn plan(&self) -> FramePlan {
        let mut plan = FramePlan::along(self.axis);
        for axis in Axis::ALL {
            if axis != self.axis {
                plan = plan.with_fixed(axis, self.fixed(axis));
            }
        }
        match &self.indices {
            Some(indices) => plan.with_indices(self.axis, indices.clone()),
            None => plan,
        }
    }
}
