//! OME-TIFF writer.
//!
//! Every plane becomes one uncompressed grayscale page. The first page
//! carries an OME-XML `ImageDescription` that tells readers how pages map to
//! Z, C and T:
//!
//! ```text
//! AxisTag   pages        SizeZ  SizeC  SizeT
//! YX        1            1      1      1
//! YXC       channels     1      n      1
//! ZYX       frames       n      1      1     (stack along Z or Tile)
//!                        1      n      1     (stack along Channel)
//!                        1      1      n     (stack along Time)
//! ```

use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::ExportError;
use crate::projection::{AxisTag, ProjectionResult, ReductionKind};
use crate::stack::{Axis, PixelData};

use super::{ExportAdapter, ExportMetadata};

const OME_NAMESPACE: &str = "http://www.openmicroscopy.org/Schemas/OME/2016-06";

/// Writes results as OME-TIFF files.
#[derive(Debug, Clone, Copy, Default)]
pub struct OmeTiffExporter;

impl OmeTiffExporter {
    pub fn new() -> Self {
        Self
    }

    /// Encode into a temporary file next to `path` and move it into place
    /// once complete. The temporary file is deleted on any failure, and
    /// whatever was at `path` before stays untouched.
    fn write(
        &self,
        result: &ProjectionResult,
        metadata: &ExportMetadata,
        path: &Path,
    ) -> Result<(), String> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| e.to_string())?;
        let description = ome_xml(result, metadata);

        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            let mut encoder = TiffEncoder::new(&mut writer).map_err(|e| e.to_string())?;
            for (index, plane) in result.planes.iter().enumerate() {
                let description = (index == 0).then_some(description.as_str());
                write_page(&mut encoder, result.width, result.height, plane, description)?;
            }
            drop(encoder);
            writer.flush().map_err(|e| e.to_string())?;
        }

        temp.persist(path).map_err(|e| e.error.to_string())?;
        Ok(())
    }
}

fn write_page<W: Write + Seek>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    plane: &PixelData,
    description: Option<&str>,
) -> Result<(), String> {
    let expected = width as usize * height as usize;
    if plane.len() != expected {
        return Err(format!(
            "plane holds {} samples, expected {}",
            plane.len(),
            expected
        ));
    }

    match plane {
        PixelData::U8(samples) => {
            let mut image = encoder
                .new_image::<colortype::Gray8>(width, height)
                .map_err(|e| e.to_string())?;
            if let Some(text) = description {
                image
                    .encoder()
                    .write_tag(Tag::ImageDescription, text)
                    .map_err(|e| e.to_string())?;
            }
            image.write_data(samples).map_err(|e| e.to_string())
        }
        PixelData::U16(samples) => {
            let mut image = encoder
                .new_image::<colortype::Gray16>(width, height)
                .map_err(|e| e.to_string())?;
            if let Some(text) = description {
                image
                    .encoder()
                    .write_tag(Tag::ImageDescription, text)
                    .map_err(|e| e.to_string())?;
            }
            image.write_data(samples).map_err(|e| e.to_string())
        }
    }
}

impl ExportAdapter for OmeTiffExporter {
    fn export(
        &self,
        result: &ProjectionResult,
        metadata: &ExportMetadata,
        path: &Path,
    ) -> Result<(), ExportError> {
        let outcome = if result.planes.is_empty() {
            Err("result has no planes".to_string())
        } else {
            self.write(result, metadata, path)
        };

        match outcome {
            Ok(()) => {
                debug!(
                    path = %path.display(),
                    pages = result.planes.len(),
                    axes = result.axes.as_str(),
                    "wrote OME-TIFF"
                );
                Ok(())
            }
            Err(message) => Err(ExportError::ExportFailed {
                path: path.display().to_string(),
                message,
            }),
        }
    }

    fn extension(&self) -> &'static str {
        "ome.tiff"
    }
}

/// Build the OME-XML description of a result.
pub fn ome_xml(result: &ProjectionResult, metadata: &ExportMetadata) -> String {
    let planes = result.planes.len();
    let (size_z, size_c, size_t) = match (result.axes, metadata.stack_axis) {
        (AxisTag::YX, _) => (1, 1, 1),
        (AxisTag::YXC, _) => (1, planes, 1),
        (AxisTag::ZYX, Axis::Channel) => (1, planes, 1),
        (AxisTag::ZYX, Axis::Time) => (1, 1, planes),
        (AxisTag::ZYX, Axis::Z | Axis::Tile) => (planes, 1, 1),
    };

    let mut physical = String::new();
    let sizes = &metadata.physical_sizes;
    for (label, value) in [("X", sizes.x), ("Y", sizes.y), ("Z", sizes.z)] {
        if let Some(v) = value {
            physical.push_str(&format!(
                r#" PhysicalSize{label}="{v}" PhysicalSize{label}Unit="&#xB5;m""#
            ));
        }
    }

    let channels: String = (0..size_c)
        .map(|c| {
            let name = metadata
                .channel_names
                .get(c)
                .or_else(|| metadata.channel_names.first())
                .map(|n| format!(r#" Name="{}""#, escape(n)))
                .unwrap_or_default();
            format!(r#"<Channel ID="Channel:0:{c}"{name} SamplesPerPixel="1"/>"#)
        })
        .collect();

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<OME xmlns="{ns}">"#,
            r#"<Image ID="Image:0" Name="{name}">"#,
            r#"<Description>{description}</Description>"#,
            r#"<Pixels ID="Pixels:0" DimensionOrder="XYZCT" Type="{pixel_type}" SignificantBits="{bits}" "#,
            r#"SizeX="{x}" SizeY="{y}" SizeZ="{z}" SizeC="{c}" SizeT="{t}"{physical}>"#,
            r#"{channels}"#,
            r#"<TiffData IFD="0" PlaneCount="{planes}"/>"#,
            r#"</Pixels></Image></OME>"#
        ),
        ns = OME_NAMESPACE,
        name = escape(&metadata.name),
        description = escape(&format!("{} projection", result.kind.label())),
        pixel_type = result.sample_type.name(),
        bits = significant_bits(result, metadata),
        x = result.width,
        y = result.height,
        z = size_z,
        c = size_c,
        t = size_t,
        physical = physical,
        channels = channels,
        planes = planes,
    )
}

/// Sum and StdDev may use the full sample range even for 12-bit sources.
fn significant_bits(result: &ProjectionResult, metadata: &ExportMetadata) -> u32 {
    let full = result.sample_type.bytes() as u32 * 8;
    match result.kind {
        ReductionKind::Max | ReductionKind::Mean | ReductionKind::None
            if metadata.bit_depth > 0 =>
        {
            metadata.bit_depth.min(full)
        }
        _ => full,
    }
}

/// Escape XML markup; non-ASCII becomes character references since TIFF
/// ASCII tags cannot hold it.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other if other.is_ascii() => out.push(other),
            other => out.push_str(&format!("&#x{:X};", other as u32)),
        }
    }
    out
}
