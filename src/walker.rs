//! Lazy, forward-only iteration over the boxes of a byte buffer.

use crate::boxes::{Box, BoxCursor};
use crate::parser::{ParseError, Result, read_box_header};
use log::trace;
use std::iter::FusedIterator;

/// Pull-based walker over consecutive ISOBMFF boxes.
///
/// Nothing is parsed until [`Iterator::next`] is called, and only the cursor
/// and the buffer reference are kept between calls. Once an error has been
/// returned the walker yields nothing more. A walker cannot be restarted;
/// build a new one to walk the same bytes again.
///
/// Offsets are absolute: a walker created through [`Box::children`] reports
/// positions in the coordinates of the outermost buffer.
#[derive(Debug)]
pub struct BoxWalker<'a> {
    buf: &'a [u8],
    base: u64,
    cursor: BoxCursor,
    // end of the last yielded box; applied on the next pull unless the
    // consumer moved the cursor in between
    pending: Option<u64>,
    done: bool,
}

impl<'a> BoxWalker<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_base(buf, 0)
    }

    /// Walk `buf`, treating its first byte as absolute offset `base`.
    pub fn with_base(buf: &'a [u8], base: u64) -> Self {
        BoxWalker {
            buf,
            base,
            cursor: BoxCursor::new(base),
            pending: None,
            done: false,
        }
    }

    /// Walk the payload of `parent`.
    pub fn children(parent: &Box<'a>) -> Self {
        parent.children()
    }

    /// Absolute offset at which the next box will be read.
    pub fn position(&self) -> u64 {
        match self.pending {
            Some(next) if !self.cursor.is_moved() => next,
            _ => self.cursor.get(),
        }
    }

    /// Resume the walk at absolute offset `pos`. Equivalent to setting the
    /// cursor of any box this walker yielded.
    pub fn seek(&mut self, pos: u64) {
        self.cursor.set(pos);
    }

    pub fn cursor(&self) -> &BoxCursor {
        &self.cursor
    }

    /// Absolute offset one past the last byte of the walked region.
    pub fn end(&self) -> u64 {
        self.base + self.buf.len() as u64
    }

    fn step(&mut self) -> Option<Result<Box<'a>>> {
        let moved = self.cursor.take_moved();
        if let Some(next) = self.pending.take() {
            if !moved {
                self.cursor.advance_to(next);
            }
        }

        let pos = self.cursor.get();
        if pos >= self.end() {
            return None;
        }
        let Some(rel) = pos.checked_sub(self.base) else {
            return Some(Err(ParseError::MalformedBox { offset: pos, size: 0 }));
        };
        // rel < buf.len(), so the cast is lossless
        let rel = rel as usize;

        let hdr = match read_box_header(self.buf, rel, self.base) {
            Ok(h) => h,
            Err(e) => return Some(Err(e)),
        };
        trace!("box '{}' at {} size {} (header {})", hdr.typ, hdr.start, hdr.size, hdr.header_size);

        let value = &self.buf[rel + hdr.header_size as usize..rel + hdr.size as usize];
        self.pending = Some(hdr.start + hdr.size);

        Some(Ok(Box {
            offset: hdr.start,
            size: hdr.size,
            header_size: hdr.header_size,
            typ: hdr.typ,
            value,
            cursor: self.cursor.clone(),
        }))
    }
}

impl<'a> Iterator for BoxWalker<'a> {
    type Item = Result<Box<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.step();
        match &item {
            None | Some(Err(_)) => self.done = true,
            Some(Ok(_)) => {}
        }
        item
    }
}

impl FusedIterator for BoxWalker<'_> {}
