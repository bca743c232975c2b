use crate::boxes::FourCC;
use crate::info::ImageInfo;
use crate::parser::{ParseError, Result};
use crate::resolver::{ResolveOptions, resolve};
use crate::validate::{FileTypeCheck, major_brand};
use crate::walker::BoxWalker;
use log::debug;

/// A container family this crate can decode.
///
/// Implementors only describe their file-type checks; the box walker is
/// shared by every ISOBMFF family and used unchanged.
pub trait ContainerDecoder: Send + Sync {
    /// Short human readable name ("AVIF", "HEIC", ...).
    fn name(&self) -> &'static str;

    fn mime_type(&self) -> &'static str;

    fn file_type(&self) -> &FileTypeCheck;

    fn validate(&self, buf: &[u8]) -> Result<()> {
        self.file_type().validate(buf)
    }

    /// Validate `buf`, then walk its top-level boxes lazily.
    fn decode<'a>(&self, buf: &'a [u8]) -> Result<BoxWalker<'a>> {
        self.validate(buf)?;
        Ok(BoxWalker::new(buf))
    }

    /// Validate `buf` and resolve its image properties.
    fn image_info(&self, buf: &[u8], opts: &ResolveOptions) -> Result<ImageInfo> {
        self.validate(buf)?;
        resolve(buf, self.mime_type(), opts)
    }
}

const AVIF_BRANDS: &[FourCC] = &[FourCC(*b"avif"), FourCC(*b"avis")];

const HEIC_BRANDS: &[FourCC] = &[
    FourCC(*b"heic"),
    FourCC(*b"heix"),
    FourCC(*b"heim"),
    FourCC(*b"heis"),
    FourCC(*b"hevc"),
    FourCC(*b"hevx"),
    FourCC(*b"mif1"),
    FourCC(*b"msf1"),
];

/// AV1 Image File Format: still images (`avif`) and sequences (`avis`).
pub struct AvifDecoder {
    check: FileTypeCheck,
}

impl AvifDecoder {
    pub const fn new() -> Self {
        AvifDecoder { check: FileTypeCheck::new(AVIF_BRANDS) }
    }
}

impl Default for AvifDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerDecoder for AvifDecoder {
    fn name(&self) -> &'static str {
        "AVIF"
    }

    fn mime_type(&self) -> &'static str {
        "image/avif"
    }

    fn file_type(&self) -> &FileTypeCheck {
        &self.check
    }
}

/// HEIF images with HEVC payloads.
pub struct HeicDecoder {
    check: FileTypeCheck,
}

impl HeicDecoder {
    pub const fn new() -> Self {
        HeicDecoder { check: FileTypeCheck::new(HEIC_BRANDS) }
    }
}

impl Default for HeicDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerDecoder for HeicDecoder {
    fn name(&self) -> &'static str {
        "HEIC"
    }

    fn mime_type(&self) -> &'static str {
        "image/heic"
    }

    fn file_type(&self) -> &FileTypeCheck {
        &self.check
    }
}

/// Ordered set of container decoders.
///
/// The registry is immutable once constructed; use [`Registry::with_decoder`]
/// to build it fluently.
pub struct Registry {
    decoders: Vec<DecoderEntry>,
}

struct DecoderEntry {
    inner: Box<dyn ContainerDecoder>,
    name: String,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { decoders: Vec::new() }
    }

    /// Return a new registry with the given decoder added.
    ///
    /// `name` is human-readable; it shows up in detection logs and in
    /// [`Registry::names`].
    pub fn with_decoder(mut self, name: &str, dec: Box<dyn ContainerDecoder>) -> Self {
        self.decoders.push(DecoderEntry { inner: dec, name: name.to_string() });
        self
    }

    pub fn decoders(&self) -> impl Iterator<Item = &(dyn ContainerDecoder + 'static)> + '_ {
        self.decoders.iter().map(|d| d.inner.as_ref())
    }

    /// Registration names, in detection order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.decoders.iter().map(|d| d.name.as_str())
    }

    /// Pick the first decoder whose file-type checks accept `buf`.
    ///
    /// When nothing accepts the buffer, the error of the first decoder is
    /// returned so that short or non-ISOBMFF input still reports `TooShort`
    /// or `MissingFileTypeBox`.
    pub fn detect(&self, buf: &[u8]) -> Result<&dyn ContainerDecoder> {
        let mut first_err = None;
        for entry in &self.decoders {
            let d = entry.inner.as_ref();
            match d.validate(buf) {
                Ok(()) => {
                    debug!("detected {} via '{}' ({:?})", d.name(), entry.name, major_brand(buf));
                    return Ok(d);
                }
                Err(e) => {
                    debug!("'{}' rejected the buffer: {e}", entry.name);
                    first_err.get_or_insert(e);
                }
            }
        }
        Err(first_err.unwrap_or(ParseError::UnsupportedBrand {
            brand: major_brand(buf).unwrap_or(FourCC(*b"????")),
        }))
    }

    pub fn decode<'a>(&self, buf: &'a [u8]) -> Result<BoxWalker<'a>> {
        self.detect(buf)?.decode(buf)
    }

    pub fn image_info(&self, buf: &[u8], opts: &ResolveOptions) -> Result<ImageInfo> {
        self.detect(buf)?.image_info(buf, opts)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_registry() -> Registry {
    Registry::new()
        .with_decoder("avif", Box::new(AvifDecoder::new()))
        .with_decoder("heic", Box::new(HeicDecoder::new()))
}
