use crate::boxes::{BoxHeader, FourCC};
use byteorder::{BigEndian, ByteOrder};

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("buffer too short for a container header ({len} bytes)")]
    TooShort { len: usize },
    #[error("first box is '{found}', expected a file type box")]
    MissingFileTypeBox { found: FourCC },
    #[error("unsupported major brand '{brand}'")]
    UnsupportedBrand { brand: FourCC },
    #[error("truncated box header at offset {offset}")]
    TruncatedHeader { offset: u64 },
    #[error("malformed box at offset {offset} (declared size {size})")]
    MalformedBox { offset: u64, size: u64 },
    #[error("'{typ}' payload is truncated")]
    TruncatedPayload { typ: FourCC },
    #[error("missing required property '{0}'")]
    MissingProperty(&'static str),
    #[error("invalid '{typ}' property: {reason}")]
    InvalidProperty { typ: FourCC, reason: &'static str },
    #[error("box nesting exceeds {depth} levels")]
    TooDeep { depth: usize },
}

/// Fieldless discriminant of [`ParseError`], handy for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    TooShort,
    MissingFileTypeBox,
    UnsupportedBrand,
    TruncatedHeader,
    MalformedBox,
    TruncatedPayload,
    MissingProperty,
    InvalidProperty,
    TooDeep,
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::Io(_) => ErrorKind::Io,
            ParseError::TooShort { .. } => ErrorKind::TooShort,
            ParseError::MissingFileTypeBox { .. } => ErrorKind::MissingFileTypeBox,
            ParseError::UnsupportedBrand { .. } => ErrorKind::UnsupportedBrand,
            ParseError::TruncatedHeader { .. } => ErrorKind::TruncatedHeader,
            ParseError::MalformedBox { .. } => ErrorKind::MalformedBox,
            ParseError::TruncatedPayload { .. } => ErrorKind::TruncatedPayload,
            ParseError::MissingProperty(_) => ErrorKind::MissingProperty,
            ParseError::InvalidProperty { .. } => ErrorKind::InvalidProperty,
            ParseError::TooDeep { .. } => ErrorKind::TooDeep,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Read and resolve the box header starting at `pos` within `buf`.
///
/// `base` is the absolute offset of `buf[0]`; it only affects the offsets
/// reported in the header and in errors. The returned header is fully
/// checked against the buffer: `start + size` never runs past its end.
pub fn read_box_header(buf: &[u8], pos: usize, base: u64) -> Result<BoxHeader> {
    let start = base + pos as u64;
    let avail = buf.len().saturating_sub(pos);
    if avail < 8 {
        return Err(ParseError::TruncatedHeader { offset: start });
    }

    let size32 = BigEndian::read_u32(&buf[pos..pos + 4]);
    let typ = FourCC([buf[pos + 4], buf[pos + 5], buf[pos + 6], buf[pos + 7]]);

    let (size, header_size) = match size32 {
        1 => {
            if avail < 16 {
                return Err(ParseError::TruncatedHeader { offset: start });
            }
            (BigEndian::read_u64(&buf[pos + 8..pos + 16]), 16u64)
        }
        0 => (avail as u64, 8u64),
        n => (n as u64, 8u64),
    };

    if size < header_size || size > avail as u64 {
        return Err(ParseError::MalformedBox { offset: start, size });
    }

    Ok(BoxHeader { size, typ, header_size, start })
}
