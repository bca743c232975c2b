use serde::Serialize;
use std::fmt;

/// Color model of the primary image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    Gray,
    Rgb,
    Yuv,
    /// An embedded ICC profile defines the color space.
    Icc,
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColorSpace::Gray => "gray",
            ColorSpace::Rgb => "rgb",
            ColorSpace::Yuv => "yuv",
            ColorSpace::Icc => "icc",
        };
        f.write_str(s)
    }
}

/// Image properties resolved from a container file.
///
/// Built once per file by the resolver; every field is set at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_space: Option<ColorSpace>,
    /// Bits per channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_depth: Option<u8>,
    /// Number of color channels, alpha excluded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_number: Option<u8>,
    pub has_alpha_channel: bool,
    pub is_animation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_frames: Option<u32>,
    /// How many times the animation plays; `Some(0)` means forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_repeat_count: Option<u32>,
}
