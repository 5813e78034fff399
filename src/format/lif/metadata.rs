//! LIF XML metadata.
//!
//! The metadata block is an XML tree of `<Element>` nodes. Folders nest their
//! children under `<Children>`; an element is an image when it carries
//! `Data/Image/ImageDescription`. Each image describes its axes and channels
//! and names the memory block holding its pixels:
//!
//! ```text
//! <Element Name="Series001">
//!   <Data><Image><ImageDescription>
//!     <Channels>
//!       <ChannelDescription Resolution="12" BytesInc="0" LUTName="Green"/>
//!     </Channels>
//!     <Dimensions>
//!       <DimensionDescription DimID="1" NumberOfElements="512" BytesInc="2" Length="1.2e-4" Unit="m"/>
//!       <DimensionDescription DimID="2" NumberOfElements="512" BytesInc="1024" .../>
//!       <DimensionDescription DimID="3" NumberOfElements="20" BytesInc="524288" .../>
//!     </Dimensions>
//!   </ImageDescription></Image></Data>
//!   <Memory Size="10485760" MemoryBlockID="MemBlock_233"/>
//! </Element>
//! ```

use roxmltree::Node;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AssemblerError, DecodeError};
use crate::stack::{Axis, FrameCoord, SampleType};

use super::header::LifVersion;

// =============================================================================
// Constants
// =============================================================================

/// Root element of the metadata document
const ROOT_TAG: &str = "LMSDataContainerHeader";

/// Dimension ids used by `DimensionDescription@DimID`
const DIM_X: u32 = 1;
const DIM_Y: u32 = 2;
const DIM_Z: u32 = 3;
const DIM_T: u32 = 4;
const DIM_TILE: u32 = 10;

// =============================================================================
// Descriptor Types
// =============================================================================

/// Extent of every axis of a series. All values are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub t: u32,
    pub channels: u32,
    pub tiles: u32,
}

impl Dimensions {
    /// Extent of a non-spatial axis.
    pub fn axis_len(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Z => self.z,
            Axis::Time => self.t,
            Axis::Channel => self.channels,
            Axis::Tile => self.tiles,
        }
    }

    /// Number of 2D frames in the series.
    pub fn frame_count(&self) -> u64 {
        self.z as u64 * self.t as u64 * self.channels as u64 * self.tiles as u64
    }
}

/// Byte increments between neighbouring indices along each axis.
///
/// Axes a series does not declare have stride 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Strides {
    pub x: u64,
    pub y: u64,
    pub z: u64,
    pub t: u64,
    pub tile: u64,
}

/// One channel of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    /// Byte offset of this channel within each frame group
    pub offset: u64,

    /// Declared significant bits
    pub resolution: u32,

    /// Lookup table name, e.g. "Green"
    pub lut_name: Option<String>,
}

/// Physical pixel pitch in micrometres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PhysicalSizes {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

/// Location of a series' pixel payload within the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payload {
    /// Memory block id referenced by the metadata
    pub block_id: String,

    /// Absolute offset of the first payload byte
    pub offset: u64,

    /// Payload length in bytes
    pub len: u64,
}

/// Metadata for one image series.
///
/// Descriptors are validated when the container is opened: every frame they
/// address lies within the payload, and the payload lies within the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesDescriptor {
    /// Position in file declaration order
    pub index: usize,

    /// Element name (may be empty)
    pub name: String,

    /// Folder path of the element within the project tree (may be empty)
    pub path: String,

    pub dims: Dimensions,
    pub sample_type: SampleType,

    /// Largest declared channel resolution in bits
    pub bit_depth: u32,

    pub strides: Strides,
    pub channels: Vec<ChannelInfo>,
    pub physical_sizes: PhysicalSizes,
    pub payload: Payload,
}

impl SeriesDescriptor {
    /// Bytes covered by one frame, from its first sample to the end of its last.
    pub fn frame_span(&self) -> u64 {
        frame_span(&self.dims, &self.strides, self.sample_type)
    }

    /// Size of the decoded frame in bytes.
    pub fn frame_bytes(&self) -> u64 {
        self.dims.x as u64 * self.dims.y as u64 * self.sample_type.bytes() as u64
    }

    /// Size of all decoded frames of the series in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.frame_bytes() * self.dims.frame_count()
    }

    /// [`total_bytes`](Self::total_bytes) in decimal megabytes (10^6 bytes).
    pub fn size_mb(&self) -> f64 {
        self.total_bytes() as f64 / 1e6
    }

    /// Check a coordinate against the series extents.
    pub fn check_coord(&self, coord: FrameCoord) -> Result<(), AssemblerError> {
        for axis in Axis::ALL {
            let index = coord.get(axis);
            let len = self.dims.axis_len(axis);
            if index >= len {
                return Err(AssemblerError::IndexOutOfRange { axis, index, len });
            }
        }
        Ok(())
    }

    /// Absolute file offset of the frame at `coord`.
    ///
    /// The coordinate must already be in range.
    pub fn frame_offset(&self, coord: FrameCoord) -> u64 {
        self.payload.offset + relative_offset(&self.strides, &self.channels, coord)
    }

    /// Channel name for display, falling back to the channel index.
    pub fn channel_label(&self, channel: u32) -> String {
        self.channels
            .get(channel as usize)
            .and_then(|c| c.lut_name.clone())
            .unwrap_or_else(|| format!("C{}", channel))
    }
}

fn frame_span(dims: &Dimensions, strides: &Strides, sample_type: SampleType) -> u64 {
    (dims.y as u64 - 1) * strides.y + (dims.x as u64 - 1) * strides.x + sample_type.bytes() as u64
}

fn relative_offset(strides: &Strides, channels: &[ChannelInfo], coord: FrameCoord) -> u64 {
    let channel_offset = channels
        .get(coord.channel as usize)
        .map(|c| c.offset)
        .unwrap_or(0);

    channel_offset
        + coord.z as u64 * strides.z
        + coord.t as u64 * strides.t
        + coord.tile as u64 * strides.tile
}

// =============================================================================
// Parsed Metadata
// =============================================================================

/// Reference from an image to its memory block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRef {
    pub block_id: String,
    pub size: u64,
}

/// An image as declared by the XML, before it is bound to a memory block.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
    pub name: String,
    pub path: String,
    pub dims: Dimensions,
    pub sample_type: SampleType,
    pub bit_depth: u32,
    pub strides: Strides,
    pub channels: Vec<ChannelInfo>,
    pub physical_sizes: PhysicalSizes,
    pub memory: MemoryRef,
}

impl ImageMetadata {
    /// Bytes from the payload start to the end of the last addressable frame.
    ///
    /// Returns `None` on arithmetic overflow.
    pub fn required_extent(&self) -> Option<u64> {
        let last = FrameCoord::new(
            self.dims.z - 1,
            self.dims.t - 1,
            0,
            self.dims.tiles - 1,
        );
        let max_channel_offset = self.channels.iter().map(|c| c.offset).max().unwrap_or(0);

        let span = (self.dims.y as u64 - 1)
            .checked_mul(self.strides.y)?
            .checked_add((self.dims.x as u64 - 1).checked_mul(self.strides.x)?)?
            .checked_add(self.sample_type.bytes() as u64)?;

        (last.z as u64)
            .checked_mul(self.strides.z)?
            .checked_add((last.t as u64).checked_mul(self.strides.t)?)?
            .checked_add((last.tile as u64).checked_mul(self.strides.tile)?)?
            .checked_add(max_channel_offset)?
            .checked_add(span)
    }

    /// Bind the image to its located payload.
    pub fn into_descriptor(self, index: usize, payload: Payload) -> SeriesDescriptor {
        SeriesDescriptor {
            index,
            name: self.name,
            path: self.path,
            dims: self.dims,
            sample_type: self.sample_type,
            bit_depth: self.bit_depth,
            strides: self.strides,
            channels: self.channels,
            physical_sizes: self.physical_sizes,
            payload,
        }
    }
}

/// Everything the metadata block declares.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMetadata {
    pub version: LifVersion,
    pub images: Vec<ImageMetadata>,
}

// =============================================================================
// XML Parsing
// =============================================================================

/// Parse the metadata document.
///
/// Images are returned in document order. Images whose memory block is empty
/// carry no pixels and are skipped.
pub fn parse_metadata(xml: &str) -> Result<ParsedMetadata, DecodeError> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| DecodeError::corrupt(format!("malformed XML: {}", e)))?;

    let root = doc.root_element();
    if !root.has_tag_name(ROOT_TAG) {
        return Err(DecodeError::corrupt(format!(
            "expected <{}> root, found <{}>",
            ROOT_TAG,
            root.tag_name().name()
        )));
    }

    let version = root
        .attribute("Version")
        .ok_or_else(|| DecodeError::corrupt("root element missing Version attribute"))?;
    let version = LifVersion::from_attribute(version)?;

    let mut images = Vec::new();
    collect_images(root, "", &mut images)?;

    debug!(?version, images = images.len(), "parsed LIF metadata");

    Ok(ParsedMetadata { version, images })
}

/// Walk `<Element>` nodes depth-first in document order.
fn collect_images(
    node: Node,
    path: &str,
    out: &mut Vec<ImageMetadata>,
) -> Result<(), DecodeError> {
    for element in child_elements(node) {
        let name = element.attribute("Name").unwrap_or("");

        if let Some(description) = image_description(element) {
            if let Some(image) = parse_image(element, description, name, path)? {
                out.push(image);
            }
        }

        let child_path = if path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", path, name)
        };
        collect_images(element, &child_path, out)?;
    }

    Ok(())
}

fn child_elements<'a, 'input>(node: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    let direct = node.children().filter(|n| n.has_tag_name("Element"));
    let nested = node
        .children()
        .filter(|n| n.has_tag_name("Children"))
        .flat_map(|c| c.children().filter(|n| n.has_tag_name("Element")));
    direct.chain(nested).collect()
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn image_description<'a, 'input>(element: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    let data = child(element, "Data")?;
    let image = child(data, "Image")?;
    child(image, "ImageDescription")
}

fn parse_image(
    element: Node,
    description: Node,
    name: &str,
    path: &str,
) -> Result<Option<ImageMetadata>, DecodeError> {
    let memory = child(element, "Memory")
        .ok_or_else(|| DecodeError::corrupt(format!("image '{}' has no <Memory> element", name)))?;
    let memory = MemoryRef {
        block_id: attr_string(memory, "MemoryBlockID")?,
        size: attr_u64(memory, "Size")?,
    };

    if memory.size == 0 {
        debug!(name, "skipping image without pixel data");
        return Ok(None);
    }

    let channels = parse_channels(description, name)?;
    let bit_depth = channels.iter().map(|c| c.resolution).max().unwrap_or(0);
    let sample_type = channel_sample_type(&channels, name)?;

    let dimensions = child(description, "Dimensions").ok_or_else(|| {
        DecodeError::corrupt(format!("image '{}' has no <Dimensions> element", name))
    })?;

    let mut axes = AxisTable::default();
    for dim in dimensions
        .children()
        .filter(|n| n.has_tag_name("DimensionDescription"))
    {
        axes.add(dim, name)?;
    }

    let x = axes
        .x
        .ok_or_else(|| DecodeError::corrupt(format!("image '{}' has no X dimension", name)))?;
    let y = axes
        .y
        .ok_or_else(|| DecodeError::corrupt(format!("image '{}' has no Y dimension", name)))?;

    if x.bytes_inc < sample_type.bytes() as u64 {
        return Err(DecodeError::corrupt(format!(
            "image '{}' X stride {} is smaller than its {}-byte samples",
            name,
            x.bytes_inc,
            sample_type.bytes()
        )));
    }

    let extent = |entry: Option<AxisEntry>| entry.map(|e| e.elements).unwrap_or(1);
    let stride = |entry: Option<AxisEntry>| entry.map(|e| e.bytes_inc).unwrap_or(0);

    let dims = Dimensions {
        x: x.elements,
        y: y.elements,
        z: extent(axes.z),
        t: extent(axes.t),
        channels: channels.len() as u32,
        tiles: extent(axes.tile),
    };

    let strides = Strides {
        x: x.bytes_inc,
        y: y.bytes_inc,
        z: stride(axes.z),
        t: stride(axes.t),
        tile: stride(axes.tile),
    };

    let physical_sizes = PhysicalSizes {
        x: x.pixel_size,
        y: y.pixel_size,
        z: axes.z.and_then(|e| e.pixel_size),
    };

    Ok(Some(ImageMetadata {
        name: name.to_string(),
        path: path.to_string(),
        dims,
        sample_type,
        bit_depth,
        strides,
        channels,
        physical_sizes,
        memory,
    }))
}

fn parse_channels(description: Node, name: &str) -> Result<Vec<ChannelInfo>, DecodeError> {
    let channels: Vec<ChannelInfo> = child(description, "Channels")
        .into_iter()
        .flat_map(|c| c.children().filter(|n| n.has_tag_name("ChannelDescription")))
        .map(|c| -> Result<ChannelInfo, DecodeError> {
            Ok(ChannelInfo {
                offset: attr_u64(c, "BytesInc")?,
                resolution: attr_u32(c, "Resolution")?,
                lut_name: c.attribute("LUTName").map(String::from),
            })
        })
        .collect::<Result<_, DecodeError>>()?;

    if channels.is_empty() {
        return Err(DecodeError::corrupt(format!(
            "image '{}' declares no channels",
            name
        )));
    }

    Ok(channels)
}

fn channel_sample_type(channels: &[ChannelInfo], name: &str) -> Result<SampleType, DecodeError> {
    let mut sample_type = None;

    for channel in channels {
        let this = SampleType::from_resolution(channel.resolution).ok_or_else(|| {
            DecodeError::corrupt(format!(
                "image '{}' has unsupported channel resolution {} bits",
                name, channel.resolution
            ))
        })?;

        match sample_type {
            None => sample_type = Some(this),
            Some(existing) if existing != this => {
                return Err(DecodeError::corrupt(format!(
                    "image '{}' mixes {} and {} channels",
                    name,
                    existing.name(),
                    this.name()
                )))
            }
            Some(_) => {}
        }
    }

    // parse_channels guarantees at least one channel
    sample_type.ok_or_else(|| DecodeError::corrupt(format!("image '{}' declares no channels", name)))
}

// =============================================================================
// Dimension Entries
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct AxisEntry {
    elements: u32,
    bytes_inc: u64,
    pixel_size: Option<f64>,
}

#[derive(Debug, Default)]
struct AxisTable {
    x: Option<AxisEntry>,
    y: Option<AxisEntry>,
    z: Option<AxisEntry>,
    t: Option<AxisEntry>,
    tile: Option<AxisEntry>,
}

impl AxisTable {
    fn add(&mut self, dim: Node, name: &str) -> Result<(), DecodeError> {
        let dim_id = attr_u32(dim, "DimID")?;
        let elements = attr_u64(dim, "NumberOfElements")?;
        if elements == 0 || elements > u32::MAX as u64 {
            return Err(DecodeError::corrupt(format!(
                "image '{}' dimension {} has invalid extent {}",
                name, dim_id, elements
            )));
        }

        let entry = AxisEntry {
            elements: elements as u32,
            bytes_inc: attr_u64(dim, "BytesInc")?,
            pixel_size: pixel_size(dim, elements),
        };

        let slot = match dim_id {
            DIM_X => &mut self.x,
            DIM_Y => &mut self.y,
            DIM_Z => &mut self.z,
            DIM_T => &mut self.t,
            DIM_TILE => &mut self.tile,
            other if entry.elements == 1 => {
                warn!(name, dim_id = other, "ignoring unknown singleton dimension");
                return Ok(());
            }
            other => {
                return Err(DecodeError::corrupt(format!(
                    "image '{}' has unsupported dimension {} with {} elements",
                    name, other, entry.elements
                )))
            }
        };

        if slot.replace(entry).is_some() {
            return Err(DecodeError::corrupt(format!(
                "image '{}' declares dimension {} twice",
                name, dim_id
            )));
        }

        Ok(())
    }
}

/// Pixel pitch in micrometres from `Length` and `Unit`.
fn pixel_size(dim: Node, elements: u64) -> Option<f64> {
    if elements < 2 {
        return None;
    }

    let length: f64 = dim.attribute("Length")?.trim().parse().ok()?;
    let scale = match dim.attribute("Unit").unwrap_or("m").trim() {
        "m" => 1e6,
        "mm" => 1e3,
        "um" | "µm" | "\u{3bc}m" => 1.0,
        "nm" => 1e-3,
        _ => return None,
    };

    let size = length.abs() * scale / (elements - 1) as f64;
    (size.is_finite() && size > 0.0).then_some(size)
}

fn attr_string(node: Node, name: &str) -> Result<String, DecodeError> {
    node.attribute(name).map(String::from).ok_or_else(|| {
        DecodeError::corrupt(format!(
            "<{}> missing attribute '{}'",
            node.tag_name().name(),
            name
        ))
    })
}

fn attr_u64(node: Node, name: &str) -> Result<u64, DecodeError> {
    let value = node.attribute(name).ok_or_else(|| {
        DecodeError::corrupt(format!(
            "<{}> missing attribute '{}'",
            node.tag_name().name(),
            name
        ))
    })?;

    value.trim().parse().map_err(|_| {
        DecodeError::corrupt(format!(
            "<{}> attribute '{}' is not an unsigned integer: '{}'",
            node.tag_name().name(),
            name,
            value
        ))
    })
}

fn attr_u32(node: Node, name: &str) -> Result<u32, DecodeError> {
    let value = attr_u64(node, name)?;
    u32::try_from(value).map_err(|_| {
        DecodeError::corrupt(format!(
            "<{}> attribute '{}' is out of range: {}",
            node.tag_name().name(),
            name,
            value
        ))
    })
}

// =============================================================================
// Tests
// =============================================================================
