//! Test utilities for integration tests.
//!
//! This module provides a tracking range reader and a builder for synthetic
//! LIF containers.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use lif_projector::error::IoError;
use lif_projector::io::RangeReader;
use lif_projector::stack::FrameCoord;

// =============================================================================
// Mock Range Reader with Request Tracking
// =============================================================================

/// A mock range reader that tracks all read requests.
///
/// This is useful for verifying that opening a container does not touch
/// pixel payloads and that frames are read one request at a time.
pub struct TrackingMockReader {
    data: Bytes,
    identifier: String,
    request_count: Arc<AtomicUsize>,
    requests: Arc<RwLock<Vec<(u64, usize)>>>,
}

impl TrackingMockReader {
    pub fn new(data: Vec<u8>, identifier: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(data),
            identifier: identifier.into(),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub async fn get_requests(&self) -> Vec<(u64, usize)> {
        self.requests.read().await.clone()
    }
}

impl Clone for TrackingMockReader {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            identifier: self.identifier.clone(),
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
        }
    }
}

#[async_trait]
impl RangeReader for TrackingMockReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.write().await.push((offset, len));

        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Sample Patterns
// =============================================================================

/// Value of a sample in a synthetic series.
pub type SampleFn = fn(FrameCoord, u32, u32) -> u16;

/// Default pattern: distinct per frame, small enough for 8-bit data.
pub fn gradient(coord: FrameCoord, x: u32, y: u32) -> u16 {
    (coord.z * 40 + coord.t * 20 + coord.channel * 5 + coord.tile * 3 + x + y) as u16
}

/// 12-bit pattern that does not fit into a byte.
pub fn gradient_12bit(coord: FrameCoord, x: u32, y: u32) -> u16 {
    (coord.z * 1000 + coord.t * 300 + coord.channel * 7 + x * 13 + y * 17 + 256) as u16
}

// =============================================================================
// LIF Builder
// =============================================================================

/// Channel arrangement within a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// One full plane per channel
    Planar,
    /// Channels interleaved per pixel (RGB style)
    Interleaved,
}

/// One image element of a synthetic container.
#[derive(Clone)]
pub struct ImageSpec {
    pub name: String,
    pub folder: Option<String>,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub t: u32,
    pub channels: u32,
    pub tiles: u32,
    pub bits: u32,
    pub layout: Layout,
    pub sample: SampleFn,
    pub empty: bool,
    pub declared_size: Option<u64>,
    pub stored_len: Option<usize>,
}

impl ImageSpec {
    pub fn new(name: &str, x: u32, y: u32) -> Self {
        Self {
            name: name.to_string(),
            folder: None,
            x,
            y,
            z: 1,
            t: 1,
            channels: 1,
            tiles: 1,
            bits: 8,
            layout: Layout::Planar,
            sample: gradient,
            empty: false,
            declared_size: None,
            stored_len: None,
        }
    }

    pub fn z(mut self, z: u32) -> Self {
        self.z = z;
        self
    }

    pub fn t(mut self, t: u32) -> Self {
        self.t = t;
        self
    }

    pub fn channels(mut self, channels: u32) -> Self {
        self.channels = channels;
        self
    }

    pub fn tiles(mut self, tiles: u32) -> Self {
        self.tiles = tiles;
        self
    }

    pub fn bits(mut self, bits: u32) -> Self {
        self.bits = bits;
        self
    }

    pub fn interleaved(mut self) -> Self {
        self.layout = Layout::Interleaved;
        self
    }

    pub fn sample(mut self, sample: SampleFn) -> Self {
        self.sample = sample;
        self
    }

    pub fn in_folder(mut self, folder: &str) -> Self {
        self.folder = Some(folder.to_string());
        self
    }

    /// An element whose memory block holds no pixels.
    pub fn empty(mut self) -> Self {
        self.empty = true;
        self
    }

    /// Override the `Memory Size` the XML declares.
    pub fn declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }

    /// Store only the first `len` payload bytes. The declared size follows
    /// unless overridden.
    pub fn stored_len(mut self, len: usize) -> Self {
        self.stored_len = Some(len);
        self
    }

    fn bytes_per_sample(&self) -> u64 {
        if self.bits > 8 {
            2
        } else {
            1
        }
    }

    /// (x stride, y stride, channel offset step, z stride)
    fn strides(&self) -> (u64, u64, u64, u64) {
        let bps = self.bytes_per_sample();
        let plane = self.x as u64 * self.y as u64 * bps;
        match self.layout {
            Layout::Planar => (bps, self.x as u64 * bps, plane, plane * self.channels as u64),
            Layout::Interleaved => {
                let pixel = bps * self.channels as u64;
                (pixel, self.x as u64 * pixel, bps, plane * self.channels as u64)
            }
        }
    }

    /// Pixel payload, Z fastest after the channel group, then T, then tiles.
    pub fn payload(&self) -> Vec<u8> {
        if self.empty {
            return Vec::new();
        }

        let bps = self.bytes_per_sample() as usize;
        let (xs, ys, cs, zs) = self.strides();
        let group = zs as usize;
        let total = group * (self.z * self.t * self.tiles) as usize;
        let mut out = vec![0u8; total];

        for tile in 0..self.tiles {
            for t in 0..self.t {
                for z in 0..self.z {
                    let base = (((tile * self.t + t) * self.z + z) as usize) * group;
                    for channel in 0..self.channels {
                        let coord = FrameCoord::new(z, t, channel, tile);
                        for y in 0..self.y {
                            for x in 0..self.x {
                                let offset = base
                                    + channel as usize * cs as usize
                                    + y as usize * ys as usize
                                    + x as usize * xs as usize;
                                let value = (self.sample)(coord, x, y);
                                out[offset..offset + bps]
                                    .copy_from_slice(&value.to_le_bytes()[..bps]);
                            }
                        }
                    }
                }
            }
        }

        if let Some(len) = self.stored_len {
            out.truncate(len);
        }
        out
    }

    fn xml(&self, block_id: &str, payload_len: u64) -> String {
        let (xs, ys, cs, zs) = self.strides();
        let t_stride = zs * self.z as u64;
        let tile_stride = t_stride * self.t as u64;

        let channels: String = (0..self.channels as u64)
            .map(|c| {
                format!(
                    r#"<ChannelDescription DataType="0" ChannelTag="0" Resolution="{}" BytesInc="{}" LUTName="{}"/>"#,
                    self.bits,
                    c * cs,
                    ["Red", "Green", "Blue", "Gray"][(c % 4) as usize]
                )
            })
            .collect();

        let mut dims = format!(
            r#"<DimensionDescription DimID="1" NumberOfElements="{}" Origin="0" Length="{}" Unit="m" BitInc="0" BytesInc="{}"/><DimensionDescription DimID="2" NumberOfElements="{}" Origin="0" Length="{}" Unit="m" BitInc="0" BytesInc="{}"/>"#,
            self.x,
            (self.x.max(2) - 1) as f64 * 2.5e-7,
            xs,
            self.y,
            (self.y.max(2) - 1) as f64 * 2.5e-7,
            ys
        );
        for (id, len, stride) in [(3, self.z, zs), (4, self.t, t_stride), (10, self.tiles, tile_stride)] {
            if len > 1 {
                dims.push_str(&format!(
                    r#"<DimensionDescription DimID="{}" NumberOfElements="{}" Origin="0" Length="{}" Unit="m" BitInc="0" BytesInc="{}"/>"#,
                    id,
                    len,
                    (len - 1) as f64 * 1e-6,
                    stride
                ));
            }
        }

        let size = self.declared_size.unwrap_or(payload_len);
        let element = format!(
            r#"<Element Name="{}" Visibility="1"><Data><Image TextDescription=""><ImageDescription><Channels>{}</Channels><Dimensions>{}</Dimensions></ImageDescription></Image></Data><Memory Size="{}" MemoryBlockID="{}"/><Children/></Element>"#,
            self.name, channels, dims, size, block_id
        );

        match &self.folder {
            Some(folder) => format!(
                r#"<Element Name="{}"><Data/><Memory Size="0" MemoryBlockID="{}_folder"/><Children>{}</Children></Element>"#,
                folder, block_id, element
            ),
            None => element,
        }
    }
}

/// Builder for synthetic LIF containers.
pub struct LifBuilder {
    version: u32,
    images: Vec<ImageSpec>,
    raw_xml: Option<String>,
}

impl LifBuilder {
    pub fn new() -> Self {
        Self {
            version: 2,
            images: Vec::new(),
            raw_xml: None,
        }
    }

    /// Container version: 1 (32-bit block sizes) or 2 (64-bit block sizes).
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn image(mut self, image: ImageSpec) -> Self {
        self.images.push(image);
        self
    }

    /// Replace the generated metadata document.
    pub fn raw_xml(mut self, xml: &str) -> Self {
        self.raw_xml = Some(xml.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let payloads: Vec<Vec<u8>> = self.images.iter().map(|i| i.payload()).collect();
        let elements: String = self
            .images
            .iter()
            .zip(&payloads)
            .enumerate()
            .map(|(i, (image, payload))| image.xml(&block_id(i), payload.len() as u64))
            .collect();

        let xml = self.raw_xml.clone().unwrap_or_else(|| {
            format!(
                r#"<LMSDataContainerHeader Version="{}"><Element Name="project.lif" CopyOption="1"><Data><Experiment Path="C:\data\project.lif"/></Data><Memory Size="0" MemoryBlockID="MemBlock_root"/><Children>{}</Children></Element></LMSDataContainerHeader>"#,
                self.version, elements
            )
        });

        let xml_units: Vec<u16> = xml.encode_utf16().collect();
        let mut out = Vec::new();
        out.extend_from_slice(&0x70u32.to_le_bytes());
        out.extend_from_slice(&(5 + xml_units.len() as u32 * 2).to_le_bytes());
        out.push(0x2A);
        out.extend_from_slice(&(xml_units.len() as u32).to_le_bytes());
        for unit in xml_units {
            out.extend_from_slice(&unit.to_le_bytes());
        }

        for (i, payload) in payloads.iter().enumerate() {
            write_block(&mut out, self.version, &block_id(i), payload);
        }

        out
    }
}

impl Default for LifBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn block_id(index: usize) -> String {
    format!("MemBlock_{}", 100 + index)
}

fn write_block(out: &mut Vec<u8>, version: u32, id: &str, payload: &[u8]) {
    let id_units: Vec<u16> = id.encode_utf16().collect();

    out.extend_from_slice(&0x70u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.push(0x2A);
    if version == 1 {
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    } else {
        out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    }
    out.push(0x2A);
    out.extend_from_slice(&(id_units.len() as u32).to_le_bytes());
    for unit in id_units {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out.extend_from_slice(payload);
}
