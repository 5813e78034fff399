//! Opened LIF containers.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::DecodeError;
use crate::io::{FileRangeReader, RangeReader};

use super::header::{
    decode_utf16le, BlockPrefix, LifHeader, LifVersion, MemoryBlock, LIF_HEADER_SIZE,
};
use super::metadata::{parse_metadata, ImageMetadata, Payload, SeriesDescriptor};

/// An opened LIF container.
///
/// Opening reads the header, the XML metadata and the memory block
/// directory, but no pixel payloads. The series table is immutable afterwards
/// and can be shared freely; frame reads go through [`Container::frames`] and
/// [`Container::read_frame`].
pub struct Container<R: RangeReader> {
    reader: R,
    version: LifVersion,
    series: Vec<SeriesDescriptor>,
}

impl Container<FileRangeReader> {
    /// Open a container from a local file.
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let reader = FileRangeReader::open(path).await?;
        Self::open(reader).await
    }
}

impl<R: RangeReader> Container<R> {
    /// Open a container over any byte source.
    ///
    /// # Errors
    /// - `BadFormat` if the file is too short or does not start like a LIF file
    /// - `CorruptMetadata` if the XML is malformed or lacks required fields
    /// - `TruncatedPayload` if a memory block or a series' frames extend past
    ///   the end of the file
    pub async fn open(reader: R) -> Result<Self, DecodeError> {
        let size = reader.size();
        if size < LIF_HEADER_SIZE as u64 {
            return Err(DecodeError::bad_format(format!(
                "file too small: need at least {} bytes, got {}",
                LIF_HEADER_SIZE, size
            )));
        }

        let header_bytes = reader.read_exact_at(0, LIF_HEADER_SIZE).await?;
        let header = LifHeader::parse(&header_bytes, size)?;

        let xml_bytes = reader
            .read_exact_at(header.xml_offset(), header.xml_len() as usize)
            .await?;
        let xml = decode_utf16le(&xml_bytes)?;
        let metadata = parse_metadata(xml.trim_start_matches('\u{feff}'))?;

        let blocks = scan_memory_blocks(&reader, &header, metadata.version).await?;
        let series = bind_series(metadata.images, &blocks, size)?;

        debug!(
            file = reader.identifier(),
            version = ?metadata.version,
            blocks = blocks.len(),
            series = series.len(),
            "opened LIF container"
        );

        Ok(Self {
            reader,
            version: metadata.version,
            series,
        })
    }

    /// All series in on-disk declaration order.
    pub fn list_series(&self) -> &[SeriesDescriptor] {
        &self.series
    }

    /// Series at `index` in declaration order.
    pub fn series(&self, index: usize) -> Option<&SeriesDescriptor> {
        self.series.get(index)
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn version(&self) -> LifVersion {
        self.version
    }

    /// Identifier of the underlying byte source (the path for local files).
    pub fn identifier(&self) -> &str {
        self.reader.identifier()
    }

    pub(crate) fn reader(&self) -> &R {
        &self.reader
    }
}

/// Walk the memory blocks following the XML block until the end of the file.
async fn scan_memory_blocks<R: RangeReader>(
    reader: &R,
    header: &LifHeader,
    version: LifVersion,
) -> Result<HashMap<String, MemoryBlock>, DecodeError> {
    let size = reader.size();
    let prefix_size = version.block_prefix_size() as u64;

    let mut blocks = HashMap::new();
    let mut position = header.blocks_offset();

    while position < size {
        if size - position < prefix_size {
            return Err(DecodeError::truncated(format!(
                "memory block header at offset {} is cut short: {} of {} bytes present",
                position,
                size - position,
                prefix_size
            )));
        }

        let prefix_bytes = reader.read_exact_at(position, prefix_size as usize).await?;
        let prefix = BlockPrefix::parse(&prefix_bytes, version, position)?;

        let id_offset = position + prefix_size;
        let id_len = prefix.id_chars as u64 * 2;
        if id_len > size - id_offset {
            return Err(DecodeError::truncated(format!(
                "memory block id at offset {} is cut short",
                id_offset
            )));
        }
        let id = decode_utf16le(&reader.read_exact_at(id_offset, id_len as usize).await?)?;

        let offset = id_offset + id_len;
        let remaining = size - offset;
        if prefix.payload_size > remaining {
            return Err(DecodeError::truncated(format!(
                "memory block '{}' declares {} bytes at offset {} but only {} remain",
                id, prefix.payload_size, offset, remaining
            )));
        }

        debug!(block = %id, offset, size = prefix.payload_size, "found memory block");

        position = offset + prefix.payload_size;
        let block = MemoryBlock {
            id: id.clone(),
            offset,
            size: prefix.payload_size,
        };
        if blocks.insert(id, block).is_some() {
            return Err(DecodeError::corrupt(format!(
                "duplicate memory block id at offset {}",
                offset
            )));
        }
    }

    Ok(blocks)
}

/// Attach every image to its memory block and check its extent.
///
/// Frames reaching past the end of the file mean the file was cut short;
/// frames that fit in the file but not in the declared payload mean the
/// metadata contradicts itself.
fn bind_series(
    images: Vec<ImageMetadata>,
    blocks: &HashMap<String, MemoryBlock>,
    file_size: u64,
) -> Result<Vec<SeriesDescriptor>, DecodeError> {
    images
        .into_iter()
        .enumerate()
        .map(|(index, image)| {
            let block = blocks.get(&image.memory.block_id).ok_or_else(|| {
                DecodeError::truncated(format!(
                    "memory block '{}' of series '{}' is missing from the file",
                    image.memory.block_id, image.name
                ))
            })?;

            if image.memory.size > block.size {
                return Err(DecodeError::truncated(format!(
                    "series '{}' declares {} payload bytes but block '{}' holds {}",
                    image.name, image.memory.size, block.id, block.size
                )));
            }

            let required = image.required_extent().ok_or_else(|| {
                DecodeError::corrupt(format!("series '{}' extent overflows", image.name))
            })?;
            if block.offset.saturating_add(required) > file_size {
                return Err(DecodeError::truncated(format!(
                    "series '{}' addresses {} bytes at offset {} but the file ends at {}",
                    image.name, required, block.offset, file_size
                )));
            }
            if required > image.memory.size {
                return Err(DecodeError::corrupt(format!(
                    "series '{}' addresses {} bytes but its payload holds {}",
                    image.name, required, image.memory.size
                )));
            }

            let payload = Payload {
                block_id: block.id.clone(),
                offset: block.offset,
                len: image.memory.size,
            };
            Ok(image.into_descriptor(index, payload))
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
