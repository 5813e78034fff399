//! Leica Image File (LIF) decoder.
//!
//! A LIF file bundles one XML metadata block describing a project tree of
//! image series with one memory block of raw pixels per series.
//!
//! # Key Concepts
//!
//! - **Blocks**: every block starts with the magic `0x70` and a length; sized
//!   fields are preceded by the marker byte `0x2A`.
//!
//! - **Version**: declared by the XML root. Version 1 uses 32-bit memory block
//!   sizes, version 2 uses 64-bit sizes.
//!
//! - **Strides**: the XML gives a byte increment per axis and per channel, so
//!   any frame can be located without reading the ones before it.

mod container;
mod header;
mod metadata;


pub use container::Container;
pub use header::{
    decode_utf16le, is_lif_header, BlockPrefix, LifHeader, LifVersion, MemoryBlock, BLOCK_MAGIC,
    LIF_HEADER_SIZE, MEMORY_MARKER,
};
pub use metadata::{
    parse_metadata, ChannelInfo, Dimensions, ImageMetadata, MemoryRef, ParsedMetadata, Payload,
    PhysicalSizes, SeriesDescriptor, Strides,
};
