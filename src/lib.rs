//! Strict reader for ISOBMFF-family image containers (AVIF, HEIC).
//!
//! [`BoxWalker`] lazily yields the boxes of an untrusted buffer without
//! copying it, a [`ContainerDecoder`] checks the file type before walking,
//! and the resolver turns the box tree into an [`ImageInfo`].

pub mod api;
pub mod boxes;
pub mod info;
pub mod known_boxes;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod util;
pub mod validate;
pub mod walker;

pub use api::{HexDump, JsonBox, get_boxes, hex_range, image_info, image_info_file};
pub use boxes::{Box, BoxCursor, BoxHeader, FourCC};
pub use info::{ColorSpace, ImageInfo};
pub use parser::{ErrorKind, ParseError, read_box_header};
pub use registry::{AvifDecoder, ContainerDecoder, HeicDecoder, Registry, default_registry};
pub use resolver::ResolveOptions;
pub use validate::{FileTypeBox, FileTypeCheck};
pub use walker::BoxWalker;
