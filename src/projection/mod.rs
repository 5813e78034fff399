//! Projection engine.
//!
//! Reduces an ordered stack of 2D frames to a single plane (or passes the
//! stack through for [`ReductionKind::None`]).

mod kind;
mod reducer;
mod request;
mod result;

pub use kind::ReductionKind;
pub use reducer::{project, project_stack, Projector};
pub use request::ProjectionRequest;
pub use result::{AxisTag, ProjectionResult};
