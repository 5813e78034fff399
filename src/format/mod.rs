//! Container format parsers.
//!
//! Currently supported formats:
//!
//! - **Leica LIF**: XML metadata block followed by raw memory blocks

pub mod lif;

pub use lif::{
    is_lif_header, ChannelInfo, Container, Dimensions, LifVersion, Payload, PhysicalSizes,
    SeriesDescriptor, Strides,
};
