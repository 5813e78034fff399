//! Frame stack assembly.
//!
//! Turns a series descriptor and a [`FramePlan`] into an ordered, lazy
//! sequence of 2D frames:
//!
//! ```text
//! ┌──────────────┐   resolve    ┌──────────────┐   cursor()   ┌──────────────┐
//! │  FramePlan   │ ───────────▶ │  FrameStack  │ ───────────▶ │ FrameCursor  │
//! │ (selection + │  (bounds     │ (validated   │  (one pass,  │ (reads one   │
//! │   nesting)   │   checked)   │  coordinates)│  restartable)│  frame/call) │
//! └──────────────┘              └──────────────┘              └──────────────┘
//! ```

mod assembler;
mod frame;
mod plan;

pub use assembler::{FrameCursor, FrameStack};
pub use frame::{Frame, PixelData, SampleType};
pub use plan::{Axis, AxisSelection, FrameCoord, FramePlan};
