use crate::parser::{ParseError, Result};
use crate::walker::BoxWalker;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const FTYP: FourCC = FourCC(*b"ftyp");

    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else { None }
    }

    /// Read a 4CC out of `buf` at `pos`, if there are enough bytes.
    pub fn from_slice(buf: &[u8], pos: usize) -> Option<Self> {
        let b = buf.get(pos..pos.checked_add(4)?)?;
        Some(FourCC([b[0], b[1], b[2], b[3]]))
    }

    pub fn as_str_lossy(&self) -> String {
        self.0.iter().map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}
impl fmt::Debug for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }
impl fmt::Display for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub size: u64,          // total size including header, already resolved (never 0)
    pub typ: FourCC,
    pub header_size: u64,   // 8, or 16 with the 64-bit size escape
    pub start: u64,         // absolute offset of header start
}

#[derive(Debug, Default)]
struct CursorState {
    pos: Cell<u64>,
    moved: Cell<bool>,
}

/// Shared read position of a [`BoxWalker`].
///
/// Every [`Box`] yielded by a walker holds a handle to the same position.
/// Setting it between two pulls makes the walker resume at the new offset
/// instead of the end of the previous box. The handle is reference counted
/// and deliberately not `Send`: one walk, one thread.
#[derive(Debug, Clone, Default)]
pub struct BoxCursor {
    state: Rc<CursorState>,
}

impl BoxCursor {
    pub(crate) fn new(pos: u64) -> Self {
        let c = BoxCursor::default();
        c.state.pos.set(pos);
        c
    }

    /// Current absolute position.
    pub fn get(&self) -> u64 {
        self.state.pos.get()
    }

    /// Move the walk to `pos`. The value is not validated.
    pub fn set(&self, pos: u64) {
        self.state.pos.set(pos);
        self.state.moved.set(true);
    }

    // Walker-side update: does not count as a consumer seek.
    pub(crate) fn advance_to(&self, pos: u64) {
        self.state.pos.set(pos);
        self.state.moved.set(false);
    }

    pub(crate) fn is_moved(&self) -> bool {
        self.state.moved.get()
    }

    /// Returns true and clears the flag if a consumer called [`BoxCursor::set`]
    /// since the last walker update.
    pub(crate) fn take_moved(&self) -> bool {
        self.state.moved.replace(false)
    }
}

/// One box as yielded by [`BoxWalker`]. `value` borrows the input buffer.
#[derive(Debug, Clone)]
pub struct Box<'a> {
    pub offset: u64,
    pub size: u64,
    pub header_size: u64,
    pub typ: FourCC,
    pub value: &'a [u8],
    pub(crate) cursor: BoxCursor,
}

impl<'a> Box<'a> {
    pub fn header(&self) -> BoxHeader {
        BoxHeader {
            size: self.size,
            typ: self.typ,
            header_size: self.header_size,
            start: self.offset,
        }
    }

    /// Live handle on the walker position that produced this box.
    pub fn cursor(&self) -> &BoxCursor {
        &self.cursor
    }

    /// Absolute offset of the first payload byte.
    pub fn payload_offset(&self) -> u64 {
        self.offset + self.header_size
    }

    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Walk the boxes nested directly in this box's payload.
    pub fn children(&self) -> BoxWalker<'a> {
        BoxWalker::with_base(self.value, self.payload_offset())
    }

    /// Split off the FullBox version and flags.
    ///
    /// Returns `(version, flags, rest)` where `rest` is the payload after the
    /// 4-byte prefix.
    pub fn full_box_header(&self) -> Result<(u8, u32, &'a [u8])> {
        if self.value.len() < 4 {
            return Err(ParseError::TruncatedPayload { typ: self.typ });
        }
        let v = self.value;
        let flags = ((v[1] as u32) << 16) | ((v[2] as u32) << 8) | (v[3] as u32);
        Ok((v[0], flags, &v[4..]))
    }

    /// Walk the boxes that follow this FullBox's version/flags prefix
    /// (`meta`, `iref`, `stsd`, ...).
    pub fn full_box_children(&self) -> Result<BoxWalker<'a>> {
        self.children_at(4)
            .ok_or(ParseError::TruncatedPayload { typ: self.typ })
    }

    /// Walk nested boxes starting `skip` bytes into the payload.
    pub fn children_at(&self, skip: usize) -> Option<BoxWalker<'a>> {
        let rest = self.value.get(skip..)?;
        Some(BoxWalker::with_base(rest, self.payload_offset() + skip as u64))
    }
}
