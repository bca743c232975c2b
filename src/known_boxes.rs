use crate::boxes::FourCC;

/// Typed view over the HEIF / AVIF / ISOBMFF boxes this crate knows about.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // File-level / top-level
    Ftyp,
    Meta,
    Moov,
    Mdat,
    Free,
    Skip,
    Uuid,

    // meta children
    Hdlr,
    Pitm,
    Iloc,
    Iinf,
    Infe,
    Iref,
    Iprp,
    Idat,
    Grpl,

    // iprp / ipco
    Ipco,
    Ipma,
    Ispe,
    Pixi,
    AuxC,
    Colr,
    Av1C,
    HvcC,
    Clap,
    Irot,
    Imir,
    Pasp,

    // image sequences
    Mvhd,
    Trak,
    Tkhd,
    Tref,
    Edts,
    Elst,
    Mdia,
    Mdhd,
    Minf,
    Vmhd,
    Dinf,
    Dref,
    Stbl,
    Stsd,
    Stts,
    Stsc,
    Stsz,
    Stco,
    Co64,
    Stss,
    Udta,

    // sample entries
    Av01,
    Hvc1,
    Hev1,

    Unknown(FourCC),
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => KnownBox::Ftyp,
            b"meta" => KnownBox::Meta,
            b"moov" => KnownBox::Moov,
            b"mdat" => KnownBox::Mdat,
            b"free" => KnownBox::Free,
            b"skip" => KnownBox::Skip,
            b"uuid" => KnownBox::Uuid,

            b"hdlr" => KnownBox::Hdlr,
            b"pitm" => KnownBox::Pitm,
            b"iloc" => KnownBox::Iloc,
            b"iinf" => KnownBox::Iinf,
            b"infe" => KnownBox::Infe,
            b"iref" => KnownBox::Iref,
            b"iprp" => KnownBox::Iprp,
            b"idat" => KnownBox::Idat,
            b"grpl" => KnownBox::Grpl,

            b"ipco" => KnownBox::Ipco,
            b"ipma" => KnownBox::Ipma,
            b"ispe" => KnownBox::Ispe,
            b"pixi" => KnownBox::Pixi,
            b"auxC" => KnownBox::AuxC,
            b"colr" => KnownBox::Colr,
            b"av1C" => KnownBox::Av1C,
            b"hvcC" => KnownBox::HvcC,
            b"clap" => KnownBox::Clap,
            b"irot" => KnownBox::Irot,
            b"imir" => KnownBox::Imir,
            b"pasp" => KnownBox::Pasp,

            b"mvhd" => KnownBox::Mvhd,
            b"trak" => KnownBox::Trak,
            b"tkhd" => KnownBox::Tkhd,
            b"tref" => KnownBox::Tref,
            b"edts" => KnownBox::Edts,
            b"elst" => KnownBox::Elst,
            b"mdia" => KnownBox::Mdia,
            b"mdhd" => KnownBox::Mdhd,
            b"minf" => KnownBox::Minf,
            b"vmhd" => KnownBox::Vmhd,
            b"dinf" => KnownBox::Dinf,
            b"dref" => KnownBox::Dref,
            b"stbl" => KnownBox::Stbl,
            b"stsd" => KnownBox::Stsd,
            b"stts" => KnownBox::Stts,
            b"stsc" => KnownBox::Stsc,
            b"stsz" => KnownBox::Stsz,
            b"stco" => KnownBox::Stco,
            b"co64" => KnownBox::Co64,
            b"stss" => KnownBox::Stss,
            b"udta" => KnownBox::Udta,

            b"av01" => KnownBox::Av01,
            b"hvc1" => KnownBox::Hvc1,
            b"hev1" => KnownBox::Hev1,

            _ => KnownBox::Unknown(cc),
        }
    }
}

// VisualSampleEntry fields before the nested configuration boxes
const VISUAL_SAMPLE_ENTRY_LEN: usize = 78;

impl KnownBox {
    /// Does this box *contain* child boxes (container semantics)?
    pub fn is_container(&self) -> bool {
        self.children_offset(&[]).is_some() || matches!(self, KnownBox::Iinf)
    }

    /// Is this a FullBox (version + flags)?
    pub fn is_full_box(&self) -> bool {
        matches!(
            self,
            KnownBox::Meta
                | KnownBox::Hdlr
                | KnownBox::Pitm
                | KnownBox::Iloc
                | KnownBox::Iinf
                | KnownBox::Infe
                | KnownBox::Iref
                | KnownBox::Ipma
                | KnownBox::Ispe
                | KnownBox::Pixi
                | KnownBox::AuxC
                | KnownBox::Mvhd
                | KnownBox::Tkhd
                | KnownBox::Elst
                | KnownBox::Mdhd
                | KnownBox::Vmhd
                | KnownBox::Dref
                | KnownBox::Stsd
                | KnownBox::Stts
                | KnownBox::Stsc
                | KnownBox::Stsz
                | KnownBox::Stco
                | KnownBox::Co64
                | KnownBox::Stss
        )
    }

    /// Where the nested boxes start inside `payload`, if this box has any.
    ///
    /// Plain containers start at 0; FullBox containers skip their prefix and
    /// any entry count in front of the children.
    pub fn children_offset(&self, payload: &[u8]) -> Option<usize> {
        match self {
            KnownBox::Moov
            | KnownBox::Trak
            | KnownBox::Edts
            | KnownBox::Mdia
            | KnownBox::Minf
            | KnownBox::Dinf
            | KnownBox::Stbl
            | KnownBox::Udta
            | KnownBox::Iprp
            | KnownBox::Ipco
            | KnownBox::Grpl
            | KnownBox::Tref => Some(0),
            KnownBox::Meta | KnownBox::Iref | KnownBox::Dref => Some(4),
            KnownBox::Stsd => Some(8),
            // entry count is u16 in version 0, u32 otherwise
            KnownBox::Iinf => match payload.first() {
                Some(0) => Some(6),
                Some(_) => Some(8),
                None => None,
            },
            KnownBox::Av01 | KnownBox::Hvc1 | KnownBox::Hev1 => Some(VISUAL_SAMPLE_ENTRY_LEN),
            _ => None,
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Meta => "Meta Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Free => "Free Space Box",
            KnownBox::Skip => "Skip Box",
            KnownBox::Uuid => "User Extension Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Pitm => "Primary Item Box",
            KnownBox::Iloc => "Item Location Box",
            KnownBox::Iinf => "Item Information Box",
            KnownBox::Infe => "Item Info Entry",
            KnownBox::Iref => "Item Reference Box",
            KnownBox::Iprp => "Item Properties Box",
            KnownBox::Idat => "Item Data Box",
            KnownBox::Grpl => "Groups List Box",
            KnownBox::Ipco => "Item Property Container Box",
            KnownBox::Ipma => "Item Property Association Box",
            KnownBox::Ispe => "Image Spatial Extents",
            KnownBox::Pixi => "Pixel Information",
            KnownBox::AuxC => "Auxiliary Type Property",
            KnownBox::Colr => "Colour Information Box",
            KnownBox::Av1C => "AV1 Codec Configuration",
            KnownBox::HvcC => "HEVC Decoder Configuration",
            KnownBox::Clap => "Clean Aperture Box",
            KnownBox::Irot => "Image Rotation",
            KnownBox::Imir => "Image Mirroring",
            KnownBox::Pasp => "Pixel Aspect Ratio Box",
            KnownBox::Mvhd => "Movie Header Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Tref => "Track Reference Box",
            KnownBox::Edts => "Edit Box",
            KnownBox::Elst => "Edit List Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Vmhd => "Video Media Header Box",
            KnownBox::Dinf => "Data Information Box",
            KnownBox::Dref => "Data Reference Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Stts => "Decoding Time to Sample Box",
            KnownBox::Stsc => "Sample To Chunk Box",
            KnownBox::Stsz => "Sample Size Box",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Co64 => "64-bit Chunk Offset Box",
            KnownBox::Stss => "Sync Sample Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Av01 => "AV1 Sample Entry",
            KnownBox::Hvc1 | KnownBox::Hev1 => "HEVC Sample Entry",
            KnownBox::Unknown(_) => "Unknown Box",
        }
    }
}
