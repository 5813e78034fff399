//! Frame and pixel buffer types.

use serde::Serialize;

use crate::io::read_u16_le;

use super::plan::FrameCoord;

// =============================================================================
// SampleType
// =============================================================================

/// Storage type of one pixel sample.
///
/// Leica stores 8-bit data in bytes and anything from 9 to 16 bits
/// (typically 12-bit camera data) in little-endian 16-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    U8,
    U16,
}

impl SampleType {
    /// Map a declared channel resolution (significant bits) to a storage type.
    pub fn from_resolution(bits: u32) -> Option<Self> {
        match bits {
            1..=8 => Some(SampleType::U8),
            9..=16 => Some(SampleType::U16),
            _ => None,
        }
    }

    /// Bytes per sample.
    pub const fn bytes(self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::U16 => 2,
        }
    }

    /// Largest representable sample value.
    pub const fn max_value(self) -> u64 {
        match self {
            SampleType::U8 => u8::MAX as u64,
            SampleType::U16 => u16::MAX as u64,
        }
    }

    /// OME pixel type name.
    pub const fn name(self) -> &'static str {
        match self {
            SampleType::U8 => "uint8",
            SampleType::U16 => "uint16",
        }
    }
}

// =============================================================================
// PixelData
// =============================================================================

/// A row-major buffer of samples of a single type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl PixelData {
    pub fn sample_type(&self) -> SampleType {
        match self {
            PixelData::U8(_) => SampleType::U8,
            PixelData::U16(_) => SampleType::U16,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index`, widened to u16.
    pub fn get(&self, index: usize) -> Option<u16> {
        match self {
            PixelData::U8(v) => v.get(index).map(|&s| s as u16),
            PixelData::U16(v) => v.get(index).copied(),
        }
    }

    /// Iterate all samples widened to u64.
    pub fn iter_wide(&self) -> Box<dyn Iterator<Item = u64> + '_> {
        match self {
            PixelData::U8(v) => Box::new(v.iter().map(|&s| s as u64)),
            PixelData::U16(v) => Box::new(v.iter().map(|&s| s as u64)),
        }
    }

    /// Build a buffer from wide values, saturating at the type's maximum.
    pub(crate) fn from_wide_saturating(
        sample_type: SampleType,
        values: impl Iterator<Item = u64>,
    ) -> Self {
        match sample_type {
            SampleType::U8 => PixelData::U8(values.map(|v| v.min(u8::MAX as u64) as u8).collect()),
            SampleType::U16 => {
                PixelData::U16(values.map(|v| v.min(u16::MAX as u64) as u16).collect())
            }
        }
    }

    /// Raw little-endian bytes of the buffer.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            PixelData::U8(v) => v.clone(),
            PixelData::U16(v) => v.iter().flat_map(|s| s.to_le_bytes()).collect(),
        }
    }

    /// Decode a 2D plane from raw payload bytes.
    ///
    /// `x_stride` and `y_stride` are byte increments between neighbouring
    /// samples and rows. Contiguous planes are decoded in one pass, other
    /// layouts (such as interleaved RGB) are gathered sample by sample.
    ///
    /// `bytes` must cover `(height - 1) * y_stride + (width - 1) * x_stride + sample size`.
    pub fn decode_plane(
        sample_type: SampleType,
        bytes: &[u8],
        width: usize,
        height: usize,
        x_stride: usize,
        y_stride: usize,
    ) -> Self {
        let bps = sample_type.bytes();

        if x_stride == bps && y_stride == width * bps {
            let plane = &bytes[..width * height * bps];
            return match sample_type {
                SampleType::U8 => PixelData::U8(plane.to_vec()),
                SampleType::U16 => PixelData::U16(
                    plane
                        .chunks_exact(2)
                        .map(read_u16_le)
                        .collect(),
                ),
            };
        }

        let offsets = (0..height)
            .flat_map(move |y| (0..width).map(move |x| y * y_stride + x * x_stride));

        match sample_type {
            SampleType::U8 => PixelData::U8(offsets.map(|o| bytes[o]).collect()),
            SampleType::U16 => PixelData::U16(
                offsets
                    .map(|o| read_u16_le(&bytes[o..o + 2]))
                    .collect(),
            ),
        }
    }
}

// =============================================================================
// Frame
// =============================================================================

/// One 2D plane of a series together with its axis coordinates.
///
/// Frames own their samples; nothing in a frame refers back into the
/// container it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub coord: FrameCoord,
    pub data: PixelData,
}

impl Frame {
    pub fn new(width: u32, height: u32, coord: FrameCoord, data: PixelData) -> Self {
        Self {
            width,
            height,
            coord,
            data,
        }
    }

    pub fn sample_type(&self) -> SampleType {
        self.data.sample_type()
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Sample at column `x`, row `y`.
    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
    }

    /// Short `WxH type` description used in shape errors.
    pub fn shape_description(&self) -> String {
        format!(
            "{}x{} {}",
            self.width,
            self.height,
            self.sample_type().name()
        )
    }
}
