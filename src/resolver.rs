//! Builds an [`ImageInfo`] out of the box tree of a validated HEIF-family file.
//!
//! Still images carry their properties in `meta/iprp/ipco` and associate them
//! with items through `ipma`; image sequences additionally describe a video
//! track under `moov`. Every nested level is read with a fresh walker over the
//! parent box payload.

use crate::boxes::{Box, FourCC};
use crate::info::{ColorSpace, ImageInfo};
use crate::known_boxes::KnownBox;
use crate::parser::{ParseError, Result};
use crate::validate::FileTypeBox;
use crate::walker::BoxWalker;
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use log::{debug, warn};
use std::io::{Cursor, Read};

const ALPHA_URNS: [&str; 2] = [
    "urn:mpeg:mpegB:cicp:systems:auxiliary:alpha",
    "urn:mpeg:hevc:2015:auxid:1",
];

/// Brands that declare an image sequence.
pub const SEQUENCE_BRANDS: [FourCC; 2] = [FourCC(*b"avis"), FourCC(*b"msf1")];

/// Limits applied while resolving untrusted files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Deepest box nesting level the resolver will enter (top level is 0).
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions { max_depth: 16 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    pub bit_depth: u8,
    pub monochrome: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColourInfo {
    Nclx { primaries: u16, transfer: u16, matrix: u16, full_range: bool },
    /// Embedded ICC profile of the given length.
    Icc(usize),
}

/// An item property from `ipco`, or a configuration box of a sample entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Extents { width: u32, height: u32 },
    /// Bit depth of each channel.
    Pixel(Vec<u8>),
    Codec(CodecConfig),
    Colour(ColourInfo),
    Auxiliary(String),
    Other(FourCC),
}

impl Property {
    fn is_alpha(&self) -> bool {
        matches!(self, Property::Auxiliary(urn) if ALPHA_URNS.contains(&urn.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Association {
    item_id: u32,
    // 1-based, 0 means "no property"
    property_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ItemReference {
    typ: FourCC,
    from: u32,
    to: u32,
}

#[derive(Debug, Default)]
struct Track {
    handler: Option<FourCC>,
    width: u32,
    height: u32,
    // None when the header says "indefinite"
    duration: Option<u64>,
    // (repeat flag, first segment duration)
    edit: Option<(bool, u64)>,
    sample_count: Option<u32>,
    stts_count: Option<u32>,
    entry_size: Option<(u16, u16)>,
    codec: Option<CodecConfig>,
    colour: Option<ColourInfo>,
}

impl Track {
    fn is_visual(&self) -> bool {
        matches!(self.handler, Some(FourCC(h)) if &h == b"pict" || &h == b"vide")
    }

    fn repeat_count(&self) -> Option<u32> {
        let (repeat, segment) = self.edit?;
        if !repeat {
            return Some(1);
        }
        match self.duration {
            Some(total) if segment > 0 => Some(total.div_ceil(segment).min(u32::MAX as u64) as u32),
            _ => Some(0),
        }
    }
}

struct Resolver {
    opts: ResolveOptions,
    ftyp: Option<FileTypeBox>,
    primary_item: Option<u32>,
    properties: Vec<Property>,
    associations: Vec<Association>,
    references: Vec<ItemReference>,
    tracks: Vec<Track>,
    saw_moov: bool,
}

/// Resolve the image properties of `buf`.
///
/// The buffer is expected to have passed the file-type checks of its
/// decoder already. Fails instead of returning a partial record when the
/// dimensions cannot be found.
pub fn resolve(buf: &[u8], mime_type: &'static str, opts: &ResolveOptions) -> Result<ImageInfo> {
    let mut r = Resolver {
        opts: *opts,
        ftyp: None,
        primary_item: None,
        properties: Vec::new(),
        associations: Vec::new(),
        references: Vec::new(),
        tracks: Vec::new(),
        saw_moov: false,
    };
    r.read_top(BoxWalker::new(buf))?;
    r.finish(mime_type)
}

fn truncated(b: &Box<'_>) -> ParseError {
    ParseError::TruncatedPayload { typ: b.typ }
}

impl Resolver {
    fn enter(&self, depth: usize) -> Result<()> {
        if depth > self.opts.max_depth {
            return Err(ParseError::TooDeep { depth: self.opts.max_depth });
        }
        Ok(())
    }

    fn read_top(&mut self, walker: BoxWalker<'_>) -> Result<()> {
        for b in walker {
            let b = b?;
            match KnownBox::from(b.typ) {
                KnownBox::Ftyp => self.ftyp = Some(FileTypeBox::parse(&b)?),
                KnownBox::Meta => self.read_meta(&b, 1)?,
                KnownBox::Moov => {
                    self.saw_moov = true;
                    self.read_moov(&b, 1)?;
                }
                _ => debug!("'{}' at {} (skipped)", b.typ, b.offset),
            }
        }
        Ok(())
    }

    fn read_meta(&mut self, meta: &Box<'_>, depth: usize) -> Result<()> {
        self.enter(depth)?;
        for b in meta.full_box_children()? {
            let b = b?;
            match KnownBox::from(b.typ) {
                KnownBox::Pitm => self.primary_item = Some(read_pitm(&b)?),
                KnownBox::Iprp => self.read_iprp(&b, depth + 1)?,
                KnownBox::Iref => self.references.extend(read_iref(&b)?),
                _ => {}
            }
        }
        Ok(())
    }

    fn read_iprp(&mut self, iprp: &Box<'_>, depth: usize) -> Result<()> {
        self.enter(depth)?;
        for b in iprp.children() {
            let b = b?;
            match KnownBox::from(b.typ) {
                KnownBox::Ipco => {
                    self.enter(depth + 1)?;
                    for p in b.children() {
                        // push every entry so ipma indices stay aligned
                        self.properties.push(read_property(&p?)?);
                    }
                }
                KnownBox::Ipma => self.associations.extend(read_ipma(&b)?),
                _ => {}
            }
        }
        Ok(())
    }

    fn read_moov(&mut self, moov: &Box<'_>, depth: usize) -> Result<()> {
        self.enter(depth)?;
        for b in moov.children() {
            let b = b?;
            if KnownBox::from(b.typ) == KnownBox::Trak {
                let mut track = Track::default();
                self.read_trak(&b, &mut track, depth + 1)?;
                self.tracks.push(track);
            }
        }
        Ok(())
    }

    fn read_trak(&self, trak: &Box<'_>, track: &mut Track, depth: usize) -> Result<()> {
        self.enter(depth)?;
        for b in trak.children() {
            let b = b?;
            match KnownBox::from(b.typ) {
                KnownBox::Tkhd => read_tkhd(&b, track)?,
                KnownBox::Edts => {
                    self.enter(depth + 1)?;
                    for e in b.children() {
                        let e = e?;
                        if KnownBox::from(e.typ) == KnownBox::Elst {
                            track.edit = read_elst(&e)?;
                        }
                    }
                }
                KnownBox::Mdia => self.read_mdia(&b, track, depth + 1)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn read_mdia(&self, mdia: &Box<'_>, track: &mut Track, depth: usize) -> Result<()> {
        self.enter(depth)?;
        for b in mdia.children() {
            let b = b?;
            match KnownBox::from(b.typ) {
                KnownBox::Hdlr => track.handler = Some(read_hdlr(&b)?),
                KnownBox::Minf => {
                    self.enter(depth + 1)?;
                    for m in b.children() {
                        let m = m?;
                        if KnownBox::from(m.typ) == KnownBox::Stbl {
                            self.read_stbl(&m, track, depth + 2)?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn read_stbl(&self, stbl: &Box<'_>, track: &mut Track, depth: usize) -> Result<()> {
        self.enter(depth)?;
        for b in stbl.children() {
            let b = b?;
            match KnownBox::from(b.typ) {
                KnownBox::Stsd => self.read_stsd(&b, track, depth + 1)?,
                KnownBox::Stsz => track.sample_count = Some(read_stsz(&b)?),
                KnownBox::Stts => track.stts_count = Some(read_stts(&b)?),
                _ => {}
            }
        }
        Ok(())
    }

    fn read_stsd(&self, stsd: &Box<'_>, track: &mut Track, depth: usize) -> Result<()> {
        self.enter(depth)?;
        let mut entries = stsd.children_at(8).ok_or_else(|| truncated(stsd))?;
        // only the first sample description matters
        let Some(entry) = entries.next() else {
            return Ok(());
        };
        let entry = entry?;
        let kb = KnownBox::from(entry.typ);
        let skip = match kb {
            KnownBox::Av01 | KnownBox::Hvc1 | KnownBox::Hev1 => kb.children_offset(entry.value),
            _ => None,
        };
        let Some(skip) = skip else {
            debug!("sample entry '{}' not understood", entry.typ);
            return Ok(());
        };
        if entry.value.len() < skip {
            return Err(truncated(&entry));
        }
        // visual sample entry: width and height at payload offset 24
        let dims = entry.value.get(24..28).ok_or_else(|| truncated(&entry))?;
        let w = BigEndian::read_u16(&dims[..2]);
        let h = BigEndian::read_u16(&dims[2..]);
        track.entry_size = Some((w, h));

        if let Some(configs) = entry.children_at(skip) {
            self.enter(depth + 1)?;
            for c in configs {
                match read_property(&c?)? {
                    Property::Codec(cfg) => track.codec = Some(cfg),
                    Property::Colour(col) => track.colour = Some(col),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn primary_properties(&self) -> Vec<&Property> {
        let Some(primary) = self.primary_item else {
            return self.properties.iter().collect();
        };
        self.item_properties(primary)
    }

    fn item_properties(&self, item_id: u32) -> Vec<&Property> {
        self.associations
            .iter()
            .filter(|a| a.item_id == item_id && a.property_index > 0)
            .filter_map(|a| {
                let p = self.properties.get(a.property_index as usize - 1);
                if p.is_none() {
                    warn!("ipma references missing property {}", a.property_index);
                }
                p
            })
            .collect()
    }

    fn has_alpha(&self) -> bool {
        if self.tracks.iter().any(|t| matches!(t.handler, Some(FourCC(h)) if &h == b"auxv")) {
            return true;
        }
        match self.primary_item {
            Some(primary) if !self.references.is_empty() => self
                .references
                .iter()
                .filter(|r| &r.typ.0 == b"auxl" && r.to == primary)
                .any(|r| self.item_properties(r.from).iter().any(|p| p.is_alpha())),
            _ => self.properties.iter().any(Property::is_alpha),
        }
    }

    fn finish(self, mime_type: &'static str) -> Result<ImageInfo> {
        let props = self.primary_properties();
        let track = self
            .tracks
            .iter()
            .find(|t| t.is_visual())
            .or_else(|| self.tracks.first());

        let extents = props
            .iter()
            .find_map(|p| match p {
                Property::Extents { width, height } => Some((*width, *height)),
                _ => None,
            })
            .or_else(|| {
                self.properties.iter().find_map(|p| match p {
                    Property::Extents { width, height } => Some((*width, *height)),
                    _ => None,
                })
            })
            .or_else(|| {
                let t = track?;
                if t.width > 0 && t.height > 0 {
                    return Some((t.width, t.height));
                }
                t.entry_size
                    .filter(|&(w, h)| w > 0 && h > 0)
                    .map(|(w, h)| (w as u32, h as u32))
            });
        let Some((width, height)) = extents else {
            return Err(ParseError::MissingProperty("ispe"));
        };

        let pixel = props.iter().find_map(|p| match p {
            Property::Pixel(depths) if !depths.is_empty() => Some(depths.clone()),
            _ => None,
        });
        let codec = props
            .iter()
            .find_map(|p| match p {
                Property::Codec(c) => Some(*c),
                _ => None,
            })
            .or_else(|| track.and_then(|t| t.codec));
        let colour = props
            .iter()
            .find_map(|p| match p {
                Property::Colour(c) => Some(*c),
                _ => None,
            })
            .or_else(|| track.and_then(|t| t.colour));

        let monochrome = codec.is_some_and(|c| c.monochrome);
        let color_space = match colour {
            _ if monochrome => Some(ColorSpace::Gray),
            Some(ColourInfo::Icc(_)) => Some(ColorSpace::Icc),
            Some(ColourInfo::Nclx { matrix: 0, .. }) => Some(ColorSpace::Rgb),
            Some(ColourInfo::Nclx { .. }) => Some(ColorSpace::Yuv),
            None if codec.is_some() => Some(ColorSpace::Yuv),
            None => None,
        };
        let color_depth = pixel
            .as_ref()
            .map(|d| d[0])
            .or_else(|| codec.map(|c| c.bit_depth));
        let color_number = pixel
            .as_ref()
            .map(|d| d.len().min(u8::MAX as usize) as u8)
            .or_else(|| codec.map(|c| if c.monochrome { 1 } else { 3 }));

        let is_sequence_brand = self
            .ftyp
            .as_ref()
            .is_some_and(|f| SEQUENCE_BRANDS.contains(&f.major_brand));
        let is_animation = is_sequence_brand || self.saw_moov;
        let (animation_frames, animation_repeat_count) = match (is_animation, track) {
            (true, Some(t)) => (t.sample_count.or(t.stts_count), t.repeat_count()),
            _ => (None, None),
        };

        let has_alpha_channel = self.has_alpha();
        debug!("resolved {width}x{height} alpha={has_alpha_channel} animation={is_animation}");

        Ok(ImageInfo {
            mime_type,
            width,
            height,
            color_space,
            color_depth,
            color_number,
            has_alpha_channel,
            is_animation,
            animation_frames,
            animation_repeat_count,
        })
    }
}

// ---------- Property and table readers ----------

pub(crate) fn read_property(b: &Box<'_>) -> Result<Property> {
    match KnownBox::from(b.typ) {
        KnownBox::Ispe => read_ispe(b),
        KnownBox::Pixi => read_pixi(b),
        KnownBox::Av1C => read_av1c(b),
        KnownBox::HvcC => read_hvcc(b),
        KnownBox::Colr => read_colr(b),
        KnownBox::AuxC => read_auxc(b),
        _ => Ok(Property::Other(b.typ)),
    }
}

fn read_ispe(b: &Box<'_>) -> Result<Property> {
    let (_, _, rest) = b.full_box_header()?;
    let mut r = Cursor::new(rest);
    let width = r.read_u32::<BigEndian>().map_err(|_| truncated(b))?;
    let height = r.read_u32::<BigEndian>().map_err(|_| truncated(b))?;
    if width == 0 || height == 0 {
        return Err(ParseError::InvalidProperty { typ: b.typ, reason: "zero image extents" });
    }
    Ok(Property::Extents { width, height })
}

fn read_pixi(b: &Box<'_>) -> Result<Property> {
    let (_, _, rest) = b.full_box_header()?;
    let mut r = Cursor::new(rest);
    let n = r.read_u8().map_err(|_| truncated(b))?;
    let mut depths = vec![0u8; n as usize];
    r.read_exact(&mut depths).map_err(|_| truncated(b))?;
    Ok(Property::Pixel(depths))
}

fn read_av1c(b: &Box<'_>) -> Result<Property> {
    let v = b.value;
    if v.len() < 4 {
        return Err(truncated(b));
    }
    if v[0] & 0x80 == 0 {
        return Err(ParseError::InvalidProperty { typ: b.typ, reason: "missing marker bit" });
    }
    let high_bitdepth = v[2] & 0x40 != 0;
    let twelve_bit = v[2] & 0x20 != 0;
    let bit_depth = match (high_bitdepth, twelve_bit) {
        (true, true) => 12,
        (true, false) => 10,
        _ => 8,
    };
    Ok(Property::Codec(CodecConfig { bit_depth, monochrome: v[2] & 0x10 != 0 }))
}

fn read_hvcc(b: &Box<'_>) -> Result<Property> {
    let v = b.value;
    if v.len() < 18 {
        return Err(truncated(b));
    }
    let chroma_format = v[16] & 0x03;
    let bit_depth = 8 + (v[17] & 0x07);
    Ok(Property::Codec(CodecConfig { bit_depth, monochrome: chroma_format == 0 }))
}

fn read_colr(b: &Box<'_>) -> Result<Property> {
    let mut r = Cursor::new(b.value);
    let mut kind = [0u8; 4];
    r.read_exact(&mut kind).map_err(|_| truncated(b))?;
    let info = match &kind {
        b"nclx" => {
            let primaries = r.read_u16::<BigEndian>().map_err(|_| truncated(b))?;
            let transfer = r.read_u16::<BigEndian>().map_err(|_| truncated(b))?;
            let matrix = r.read_u16::<BigEndian>().map_err(|_| truncated(b))?;
            let full_range = r.read_u8().map_err(|_| truncated(b))? & 0x80 != 0;
            ColourInfo::Nclx { primaries, transfer, matrix, full_range }
        }
        b"rICC" | b"prof" => ColourInfo::Icc(b.value.len() - 4),
        _ => return Ok(Property::Other(b.typ)),
    };
    Ok(Property::Colour(info))
}

fn read_auxc(b: &Box<'_>) -> Result<Property> {
    let (_, _, rest) = b.full_box_header()?;
    let urn = rest.split(|&c| c == 0).next().unwrap_or_default();
    Ok(Property::Auxiliary(String::from_utf8_lossy(urn).into_owned()))
}

fn read_pitm(b: &Box<'_>) -> Result<u32> {
    let (version, _, rest) = b.full_box_header()?;
    let mut r = Cursor::new(rest);
    let id = if version == 0 {
        r.read_u16::<BigEndian>().map(u32::from)
    } else {
        r.read_u32::<BigEndian>()
    };
    id.map_err(|_| truncated(b))
}

fn read_ipma(b: &Box<'_>) -> Result<Vec<Association>> {
    let (version, flags, rest) = b.full_box_header()?;
    let mut r = Cursor::new(rest);
    let entry_count = r.read_u32::<BigEndian>().map_err(|_| truncated(b))?;

    // capacity is not taken from the untrusted count
    let mut out = Vec::new();
    for _ in 0..entry_count {
        let item_id = if version < 1 {
            r.read_u16::<BigEndian>().map(u32::from)
        } else {
            r.read_u32::<BigEndian>()
        }
        .map_err(|_| truncated(b))?;
        let count = r.read_u8().map_err(|_| truncated(b))?;
        for _ in 0..count {
            let property_index = if flags & 1 == 1 {
                r.read_u16::<BigEndian>().map_err(|_| truncated(b))? & 0x7fff
            } else {
                (r.read_u8().map_err(|_| truncated(b))? & 0x7f) as u16
            };
            out.push(Association { item_id, property_index });
        }
    }
    Ok(out)
}

fn read_iref(b: &Box<'_>) -> Result<Vec<ItemReference>> {
    let (version, _, _) = b.full_box_header()?;
    let mut out = Vec::new();
    for child in b.full_box_children()? {
        let child = child?;
        let mut r = Cursor::new(child.value);
        let id = |r: &mut Cursor<&[u8]>| {
            if version == 0 {
                r.read_u16::<BigEndian>().map(u32::from)
            } else {
                r.read_u32::<BigEndian>()
            }
            .map_err(|_| truncated(&child))
        };
        let from = id(&mut r)?;
        let count = r.read_u16::<BigEndian>().map_err(|_| truncated(&child))?;
        for _ in 0..count {
            let to = id(&mut r)?;
            out.push(ItemReference { typ: child.typ, from, to });
        }
    }
    Ok(out)
}

fn read_tkhd(b: &Box<'_>, track: &mut Track) -> Result<()> {
    let (version, _, rest) = b.full_box_header()?;
    let mut r = Cursor::new(rest);
    let t = |e: std::io::Error| -> ParseError {
        debug!("tkhd: {e}");
        truncated(b)
    };
    let duration = if version == 1 {
        r.read_u64::<BigEndian>().map_err(t)?; // creation
        r.read_u64::<BigEndian>().map_err(t)?; // modification
        r.read_u32::<BigEndian>().map_err(t)?; // track id
        r.read_u32::<BigEndian>().map_err(t)?; // reserved
        let d = r.read_u64::<BigEndian>().map_err(t)?;
        (d != u64::MAX).then_some(d)
    } else {
        r.read_u32::<BigEndian>().map_err(t)?;
        r.read_u32::<BigEndian>().map_err(t)?;
        r.read_u32::<BigEndian>().map_err(t)?;
        r.read_u32::<BigEndian>().map_err(t)?;
        let d = r.read_u32::<BigEndian>().map_err(t)?;
        (d != u32::MAX).then_some(d as u64)
    };
    // reserved, layer, alternate group, volume, reserved, matrix
    let mut skip = [0u8; 8 + 8 + 36];
    r.read_exact(&mut skip).map_err(t)?;
    track.width = r.read_u32::<BigEndian>().map_err(t)? >> 16;
    track.height = r.read_u32::<BigEndian>().map_err(t)? >> 16;
    track.duration = duration;
    Ok(())
}

fn read_elst(b: &Box<'_>) -> Result<Option<(bool, u64)>> {
    let (version, flags, rest) = b.full_box_header()?;
    let mut r = Cursor::new(rest);
    let count = r.read_u32::<BigEndian>().map_err(|_| truncated(b))?;
    if count == 0 {
        return Ok(None);
    }
    let segment = if version == 1 {
        r.read_u64::<BigEndian>()
    } else {
        r.read_u32::<BigEndian>().map(u64::from)
    }
    .map_err(|_| truncated(b))?;
    Ok(Some((flags & 1 == 1, segment)))
}

fn read_hdlr(b: &Box<'_>) -> Result<FourCC> {
    let (_, _, rest) = b.full_box_header()?;
    // pre_defined u32, then handler type
    FourCC::from_slice(rest, 4).ok_or_else(|| truncated(b))
}

fn read_stsz(b: &Box<'_>) -> Result<u32> {
    let (_, _, rest) = b.full_box_header()?;
    let mut r = Cursor::new(rest);
    let _sample_size = r.read_u32::<BigEndian>().map_err(|_| truncated(b))?;
    r.read_u32::<BigEndian>().map_err(|_| truncated(b))
}

fn read_stts(b: &Box<'_>) -> Result<u32> {
    let (_, _, rest) = b.full_box_header()?;
    let mut r = Cursor::new(rest);
    let count = r.read_u32::<BigEndian>().map_err(|_| truncated(b))?;
    let mut total = 0u32;
    for _ in 0..count {
        let samples = r.read_u32::<BigEndian>().map_err(|_| truncated(b))?;
        let _delta = r.read_u32::<BigEndian>().map_err(|_| truncated(b))?;
        total = total.saturating_add(samples);
    }
    Ok(total)
}
