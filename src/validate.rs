//! Structural preconditions checked before a buffer is walked.

use crate::boxes::{Box, FourCC};
use crate::parser::{ParseError, Result};
use byteorder::{BigEndian, ByteOrder};
use log::debug;

/// Minimum bytes needed to read a box header plus a major brand.
pub const MIN_HEADER_LEN: usize = 12;

/// File-type checks for one container family.
///
/// Only the mandatory first box type and the major brand are examined;
/// the compatible brand list is never consulted for acceptance.
#[derive(Debug, Clone, Copy)]
pub struct FileTypeCheck {
    pub first_box: FourCC,
    pub brands: &'static [FourCC],
    pub min_len: usize,
}

impl FileTypeCheck {
    pub const fn new(brands: &'static [FourCC]) -> Self {
        FileTypeCheck { first_box: FourCC::FTYP, brands, min_len: MIN_HEADER_LEN }
    }

    pub fn accepts_brand(&self, brand: FourCC) -> bool {
        self.brands.contains(&brand)
    }

    /// Run the checks in order: length, first box type, major brand.
    ///
    /// The size field of the first box is not consulted.
    pub fn validate(&self, buf: &[u8]) -> Result<()> {
        if buf.len() < self.min_len.max(MIN_HEADER_LEN) {
            return Err(ParseError::TooShort { len: buf.len() });
        }

        let found = FourCC([buf[4], buf[5], buf[6], buf[7]]);
        if found != self.first_box {
            debug!("first box is '{found}', wanted '{}'", self.first_box);
            return Err(ParseError::MissingFileTypeBox { found });
        }

        let brand = FourCC([buf[8], buf[9], buf[10], buf[11]]);
        if !self.accepts_brand(brand) {
            debug!("major brand '{brand}' not in {:?}", self.brands);
            return Err(ParseError::UnsupportedBrand { brand });
        }
        Ok(())
    }
}

/// Read the major brand of a buffer without validating anything else.
pub fn major_brand(buf: &[u8]) -> Option<FourCC> {
    FourCC::from_slice(buf, 8)
}

/// Decoded `ftyp` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeBox {
    pub major_brand: FourCC,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCC>,
}

impl FileTypeBox {
    pub fn parse(b: &Box<'_>) -> Result<Self> {
        let v = b.value;
        if v.len() < 8 {
            return Err(ParseError::TruncatedPayload { typ: b.typ });
        }
        let major_brand = FourCC([v[0], v[1], v[2], v[3]]);
        let minor_version = BigEndian::read_u32(&v[4..8]);
        // trailing partial entries are ignored
        let compatible_brands = v[8..]
            .chunks_exact(4)
            .map(|c| FourCC([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(FileTypeBox { major_brand, minor_version, compatible_brands })
    }

    pub fn is_compatible_with(&self, brand: FourCC) -> bool {
        self.major_brand == brand || self.compatible_brands.contains(&brand)
    }
}
