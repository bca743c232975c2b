use crate::{
    boxes::Box as BmffBox,
    info::ImageInfo,
    known_boxes::KnownBox,
    parser::{ParseError, Result},
    registry::default_registry,
    resolver::{ColourInfo, Property, ResolveOptions, read_property},
    util::{byte_range, hex_dump},
    validate::FileTypeBox,
    walker::BoxWalker,
};
use serde::Serialize;
use std::path::Path;

/// A JSON-serializable representation of a single box and its children.
///
/// This is designed for tools such as `bmffdump` and for UIs that want to
/// show the layout of a file.
#[derive(Debug, Serialize)]
pub struct JsonBox {
    /// Absolute byte offset of this box in the file
    pub offset: u64,
    /// Total size of this box including header and payload
    pub size: u64,
    /// 8 for normal boxes, 16 when the 64-bit size escape is used
    pub header_size: u64,
    /// Absolute offset where payload data starts
    pub payload_offset: u64,
    pub payload_size: u64,

    /// Four-character box type code (e.g. "ftyp", "ipco")
    pub typ: String,
    /// Version field for FullBox types
    pub version: Option<u8>,
    /// Flags field for FullBox types
    pub flags: Option<u32>,
    /// "leaf", "full" or "container"
    pub kind: String,
    /// Human-readable box type name (e.g. "File Type Box")
    pub full_name: String,
    /// Short summary of the payload when a reader exists for this type
    pub decoded: Option<String>,
    /// Child boxes for container types
    pub children: Option<Vec<JsonBox>>,
}

/// Walk `buf` and return the whole box tree.
///
/// No file-type checks are performed, so any ISOBMFF file can be inspected.
/// Containers nested deeper than `max_depth` fail with `TooDeep`.
pub fn get_boxes(buf: &[u8], decode: bool, max_depth: usize) -> Result<Vec<JsonBox>> {
    build_level(BoxWalker::new(buf), decode, 0, max_depth)
}

fn build_level(walker: BoxWalker<'_>, decode: bool, depth: usize, max_depth: usize) -> Result<Vec<JsonBox>> {
    if depth > max_depth {
        return Err(ParseError::TooDeep { depth: max_depth });
    }
    walker
        .map(|b| build_box(&b?, decode, depth, max_depth))
        .collect()
}

fn build_box(b: &BmffBox<'_>, decode: bool, depth: usize, max_depth: usize) -> Result<JsonBox> {
    let kb = KnownBox::from(b.typ);

    let (version, flags) = match (kb.is_full_box(), b.full_box_header()) {
        (true, Ok((v, f, _))) => (Some(v), Some(f)),
        _ => (None, None),
    };

    let children = match kb.children_offset(b.value).and_then(|skip| b.children_at(skip)) {
        Some(kids) => Some(build_level(kids, decode, depth + 1, max_depth)?),
        None => None,
    };

    let kind = if children.is_some() {
        "container"
    } else if version.is_some() {
        "full"
    } else {
        "leaf"
    };

    Ok(JsonBox {
        offset: b.offset,
        size: b.size,
        header_size: b.header_size,
        payload_offset: b.payload_offset(),
        payload_size: b.value.len() as u64,
        typ: b.typ.to_string(),
        version,
        flags,
        kind: kind.to_string(),
        full_name: kb.full_name().to_string(),
        decoded: if decode { describe(b) } else { None },
        children,
    })
}

/// One-line summary of the payloads this crate knows how to read.
pub fn describe(b: &BmffBox<'_>) -> Option<String> {
    if KnownBox::from(b.typ) == KnownBox::Ftyp {
        return Some(match FileTypeBox::parse(b) {
            Ok(f) => format!(
                "major={} minor={} compatible={:?}",
                f.major_brand, f.minor_version, f.compatible_brands
            ),
            Err(e) => format!("[decode error: {}]", e),
        });
    }
    match read_property(b) {
        Ok(Property::Extents { width, height }) => Some(format!("width={} height={}", width, height)),
        Ok(Property::Pixel(depths)) => Some(format!("bits_per_channel={:?}", depths)),
        Ok(Property::Codec(c)) => Some(format!("bit_depth={} monochrome={}", c.bit_depth, c.monochrome)),
        Ok(Property::Colour(ColourInfo::Nclx { primaries, transfer, matrix, full_range })) => Some(format!(
            "nclx primaries={} transfer={} matrix={} full_range={}",
            primaries, transfer, matrix, full_range
        )),
        Ok(Property::Colour(ColourInfo::Icc(len))) => Some(format!("icc profile ({} bytes)", len)),
        Ok(Property::Auxiliary(urn)) => Some(format!("aux_type={}", urn)),
        Ok(Property::Other(_)) => None,
        Err(e) => Some(format!("[decode error: {}]", e)),
    }
}

/// Result of a hex dump operation containing the formatted hex output.
#[derive(Debug, Serialize)]
pub struct HexDump {
    /// Starting offset of the dumped data
    pub offset: u64,
    /// Actual number of bytes dumped
    pub length: u64,
    /// Formatted hex dump string with addresses and ASCII representation
    pub hex: String,
}

/// Hex-dump a range of `buf`.
///
/// Never reads past the end; if `offset + max_len` goes beyond the buffer
/// the returned length is smaller than `max_len`.
pub fn hex_range(buf: &[u8], offset: u64, max_len: u64) -> HexDump {
    let data = byte_range(buf, offset, max_len);
    HexDump {
        offset,
        length: data.len() as u64,
        hex: hex_dump(data, offset),
    }
}

/// Detect the container family of `buf` and resolve its image properties
/// with the default registry and limits.
pub fn image_info(buf: &[u8]) -> Result<ImageInfo> {
    default_registry().image_info(buf, &ResolveOptions::default())
}

/// Read a whole file into memory and run [`image_info`] on it.
pub fn image_info_file(path: impl AsRef<Path>) -> Result<ImageInfo> {
    let data = std::fs::read(path)?;
    image_info(&data)
}
