//! LIF block headers.
//!
//! A LIF file is a sequence of length-prefixed blocks. The first block holds
//! the XML metadata, every following block is a memory block holding raw
//! pixel data for one image.
//!
//! # Metadata Block
//! ```text
//! Bytes 0-3:   Block magic (0x00000070, little-endian)
//! Bytes 4-7:   Block length
//! Byte  8:     Memory marker (0x2A)
//! Bytes 9-12:  XML length in UTF-16 code units
//! Bytes 13-:   XML document, UTF-16LE
//! ```
//!
//! # Memory Block
//! ```text
//! u32      Block magic (0x70)
//! u32      Block length
//! u8       Memory marker (0x2A)
//! u32/u64  Payload size (u32 in version 1, u64 in version 2)
//! u8       Memory marker (0x2A)
//! u32      Block id length in UTF-16 code units
//! ...      Block id, UTF-16LE (e.g. "MemBlock_233")
//! ...      Payload
//! ```

use crate::error::DecodeError;
use crate::io::{read_u32_le, read_u64_le};

// =============================================================================
// Constants
// =============================================================================

/// Magic value opening every block
pub const BLOCK_MAGIC: u32 = 0x70;

/// Marker byte preceding sized fields
pub const MEMORY_MARKER: u8 = 0x2A;

/// Size of the fixed part of the metadata block header in bytes
pub const LIF_HEADER_SIZE: usize = 13;

// =============================================================================
// LifVersion
// =============================================================================

/// Container format version, declared by the XML root element.
///
/// The version only changes the width of the memory block size field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifVersion {
    /// 32-bit memory block sizes
    V1,
    /// 64-bit memory block sizes
    V2,
}

impl LifVersion {
    /// Parse the `Version` attribute of `LMSDataContainerHeader`.
    pub fn from_attribute(value: &str) -> Result<Self, DecodeError> {
        match value.trim() {
            "1" => Ok(LifVersion::V1),
            "2" => Ok(LifVersion::V2),
            other => Err(DecodeError::bad_format(format!(
                "unknown LIF version '{}'",
                other
            ))),
        }
    }

    /// Size of the fixed memory block prefix (everything before the id string).
    pub const fn block_prefix_size(self) -> usize {
        match self {
            LifVersion::V1 => 4 + 4 + 1 + 4 + 1 + 4,
            LifVersion::V2 => 4 + 4 + 1 + 8 + 1 + 4,
        }
    }
}

// =============================================================================
// LifHeader
// =============================================================================

/// Parsed header of the metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifHeader {
    /// Declared length of the metadata block
    pub block_length: u32,

    /// Length of the XML document in UTF-16 code units
    pub xml_chars: u32,
}

impl LifHeader {
    /// Parse the metadata block header.
    ///
    /// # Errors
    /// - `BadFormat` if the file is too short or the magic/marker do not match
    /// - `CorruptMetadata` if the XML extends past the end of the file
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, DecodeError> {
        if bytes.len() < LIF_HEADER_SIZE || file_size < LIF_HEADER_SIZE as u64 {
            return Err(DecodeError::bad_format(format!(
                "file too small: need at least {} bytes, got {}",
                LIF_HEADER_SIZE,
                file_size.min(bytes.len() as u64)
            )));
        }

        let magic = read_u32_le(&bytes[0..4]);
        if magic != BLOCK_MAGIC {
            return Err(DecodeError::bad_format(format!(
                "invalid magic: expected 0x{:08X}, got 0x{:08X}",
                BLOCK_MAGIC, magic
            )));
        }

        if bytes[8] != MEMORY_MARKER {
            return Err(DecodeError::bad_format(format!(
                "invalid header marker: expected 0x{:02X}, got 0x{:02X}",
                MEMORY_MARKER, bytes[8]
            )));
        }

        let header = LifHeader {
            block_length: read_u32_le(&bytes[4..8]),
            xml_chars: read_u32_le(&bytes[9..13]),
        };

        if header.blocks_offset() > file_size {
            return Err(DecodeError::corrupt(format!(
                "XML block declares {} bytes but file has {}",
                header.xml_len(),
                file_size - LIF_HEADER_SIZE as u64
            )));
        }

        Ok(header)
    }

    /// Offset of the XML document.
    pub const fn xml_offset(&self) -> u64 {
        LIF_HEADER_SIZE as u64
    }

    /// Length of the XML document in bytes.
    pub const fn xml_len(&self) -> u64 {
        self.xml_chars as u64 * 2
    }

    /// Offset of the first memory block.
    pub const fn blocks_offset(&self) -> u64 {
        self.xml_offset() + self.xml_len()
    }
}

// =============================================================================
// Memory Blocks
// =============================================================================

/// Fixed prefix of a memory block, before the id string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPrefix {
    /// Payload size in bytes
    pub payload_size: u64,

    /// Length of the block id in UTF-16 code units
    pub id_chars: u32,
}

impl BlockPrefix {
    /// Parse a memory block prefix.
    ///
    /// `bytes` must hold at least `version.block_prefix_size()` bytes.
    pub fn parse(bytes: &[u8], version: LifVersion, position: u64) -> Result<Self, DecodeError> {
        let required = version.block_prefix_size();
        if bytes.len() < required {
            return Err(DecodeError::truncated(format!(
                "memory block header at offset {} is cut short",
                position
            )));
        }

        let magic = read_u32_le(&bytes[0..4]);
        if magic != BLOCK_MAGIC {
            return Err(DecodeError::bad_format(format!(
                "invalid memory block magic at offset {}: got 0x{:08X}",
                position, magic
            )));
        }
        check_marker(bytes[8], position + 8)?;

        let (payload_size, rest) = match version {
            LifVersion::V1 => (read_u32_le(&bytes[9..13]) as u64, 13),
            LifVersion::V2 => (read_u64_le(&bytes[9..17]), 17),
        };
        check_marker(bytes[rest], position + rest as u64)?;

        Ok(BlockPrefix {
            payload_size,
            id_chars: read_u32_le(&bytes[rest + 1..rest + 5]),
        })
    }
}

/// A memory block located in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBlock {
    /// Block id referenced by the XML `Memory` element
    pub id: String,

    /// Offset of the payload in the file
    pub offset: u64,

    /// Payload size in bytes
    pub size: u64,
}

fn check_marker(byte: u8, position: u64) -> Result<(), DecodeError> {
    if byte != MEMORY_MARKER {
        return Err(DecodeError::bad_format(format!(
            "invalid marker at offset {}: expected 0x{:02X}, got 0x{:02X}",
            position, MEMORY_MARKER, byte
        )));
    }
    Ok(())
}

/// Decode a UTF-16LE string.
pub fn decode_utf16le(bytes: &[u8]) -> Result<String, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::corrupt("UTF-16 string has odd byte length"));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units).map_err(|e| DecodeError::corrupt(format!("invalid UTF-16: {}", e)))
}

/// Check if bytes start like a LIF container.
///
/// This is a quick check that can be used before attempting full parsing.
pub fn is_lif_header(bytes: &[u8]) -> bool {
    bytes.len() >= LIF_HEADER_SIZE
        && read_u32_le(&bytes[0..4]) == BLOCK_MAGIC
        && bytes[8] == MEMORY_MARKER
}

// =============================================================================
// Tests
// =============================================================================
