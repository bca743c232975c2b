#![allow(dead_code)]

//! Builders for small synthetic HEIF-family files.

/// Route `log` output through the test harness; `RUST_LOG=trace` shows every box.
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const ALPHA_URN: &[u8] = b"urn:mpeg:mpegB:cicp:systems:auxiliary:alpha\0";

/// Plain box: 32-bit size, type, payload.
pub fn bx(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

/// FullBox: version and 24-bit flags in front of the payload.
pub fn full(typ: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut p = vec![version];
    p.extend_from_slice(&flags.to_be_bytes()[1..]);
    p.extend_from_slice(payload);
    bx(typ, &p)
}

pub fn ftyp(major: &[u8; 4], compatible: &[&[u8; 4]]) -> Vec<u8> {
    let mut p = major.to_vec();
    p.extend_from_slice(&0u32.to_be_bytes());
    for c in compatible {
        p.extend_from_slice(*c);
    }
    bx(b"ftyp", &p)
}

pub fn ispe(width: u32, height: u32) -> Vec<u8> {
    let mut p = width.to_be_bytes().to_vec();
    p.extend_from_slice(&height.to_be_bytes());
    full(b"ispe", 0, 0, &p)
}

pub fn pixi(depths: &[u8]) -> Vec<u8> {
    let mut p = vec![depths.len() as u8];
    p.extend_from_slice(depths);
    full(b"pixi", 0, 0, &p)
}

/// av1C with the given bit depth (8/10/12).
pub fn av1c(bit_depth: u8, monochrome: bool) -> Vec<u8> {
    let mut flags = match bit_depth {
        12 => 0x60,
        10 => 0x40,
        _ => 0x00,
    };
    if monochrome {
        flags |= 0x10;
    }
    bx(b"av1C", &[0x81, 0x00, flags, 0x00])
}

/// hvcC with just enough bytes for chroma format and luma depth.
pub fn hvcc(bit_depth: u8, chroma_format: u8) -> Vec<u8> {
    let mut p = vec![0u8; 23];
    p[0] = 1;
    p[16] = 0xfc | chroma_format;
    p[17] = 0xf8 | (bit_depth - 8);
    bx(b"hvcC", &p)
}

pub fn nclx(matrix: u16) -> Vec<u8> {
    let mut p = b"nclx".to_vec();
    p.extend_from_slice(&1u16.to_be_bytes());
    p.extend_from_slice(&13u16.to_be_bytes());
    p.extend_from_slice(&matrix.to_be_bytes());
    p.push(0x80);
    bx(b"colr", &p)
}

pub fn icc(profile_len: usize) -> Vec<u8> {
    let mut p = b"prof".to_vec();
    p.extend(std::iter::repeat_n(0u8, profile_len));
    bx(b"colr", &p)
}

pub fn auxc(urn: &[u8]) -> Vec<u8> {
    full(b"auxC", 0, 0, urn)
}

/// ipma version 0 with 7-bit property indices.
pub fn ipma(entries: &[(u16, &[u8])]) -> Vec<u8> {
    let mut p = (entries.len() as u32).to_be_bytes().to_vec();
    for (item, props) in entries {
        p.extend_from_slice(&item.to_be_bytes());
        p.push(props.len() as u8);
        p.extend_from_slice(props);
    }
    full(b"ipma", 0, 0, &p)
}

fn hdlr(handler: &[u8; 4]) -> Vec<u8> {
    let mut p = vec![0u8; 4];
    p.extend_from_slice(handler);
    p.extend_from_slice(&[0u8; 12]);
    p.push(0);
    full(b"hdlr", 0, 0, &p)
}

/// Still image: item 1 is the primary image and gets `ispe` plus
/// `props`; with `alpha`, item 2 is an alpha auxiliary image of item 1.
pub fn still_image(brand: &[u8; 4], width: u32, height: u32, props: &[Vec<u8>], alpha: bool) -> Vec<u8> {
    let mut ipco = ispe(width, height);
    for p in props {
        ipco.extend_from_slice(p);
    }
    let primary: Vec<u8> = (1..=props.len() as u8 + 1).collect();
    let alpha_props = [props.len() as u8 + 2, props.len() as u8 + 3];
    let mut entries: Vec<(u16, &[u8])> = vec![(1, primary.as_slice())];
    if alpha {
        ipco.extend(ispe(width, height));
        ipco.extend(auxc(ALPHA_URN));
        entries.push((2, &alpha_props[..]));
    }

    let mut meta = hdlr(b"pict");
    meta.extend(full(b"pitm", 0, 0, &1u16.to_be_bytes()));
    if alpha {
        // auxl: from item 2 to item 1
        let mut r = 2u16.to_be_bytes().to_vec();
        r.extend_from_slice(&1u16.to_be_bytes());
        r.extend_from_slice(&1u16.to_be_bytes());
        meta.extend(full(b"iref", 0, 0, &bx(b"auxl", &r)));
    }
    let mut iprp = bx(b"ipco", &ipco);
    iprp.extend(ipma(&entries));
    meta.extend(bx(b"iprp", &iprp));

    let mut file = ftyp(brand, &[b"mif1", b"miaf"]);
    file.extend(full(b"meta", 0, 0, &meta));
    file.extend(bx(b"mdat", &[0xaa; 16]));
    file
}

pub struct Sequence {
    pub frames: u32,
    pub width: u32,
    pub height: u32,
    pub track_duration: u32,
    /// (repeat flag, segment duration) of the single edit list entry
    pub edit: Option<(bool, u32)>,
}

/// `av01` visual sample entry carrying an `av1C` (10-bit).
pub fn sample_entry(width: u16, height: u16) -> Vec<u8> {
    let mut e = vec![0u8; 78];
    e[7] = 1; // data reference index
    e[24..26].copy_from_slice(&width.to_be_bytes());
    e[26..28].copy_from_slice(&height.to_be_bytes());
    e[74..76].copy_from_slice(&0x18u16.to_be_bytes());
    e.extend(av1c(10, false));
    bx(b"av01", &e)
}

/// Image sequence with one `pict` track and no still-image metadata.
pub fn sequence(s: &Sequence) -> Vec<u8> {
    let mut tkhd = Vec::new();
    for v in [0u32, 0, 1, 0, s.track_duration] {
        tkhd.extend_from_slice(&v.to_be_bytes());
    }
    tkhd.extend_from_slice(&[0u8; 8 + 8 + 36]);
    tkhd.extend_from_slice(&(s.width << 16).to_be_bytes());
    tkhd.extend_from_slice(&(s.height << 16).to_be_bytes());

    let mut trak = full(b"tkhd", 0, 3, &tkhd);
    if let Some((repeat, segment)) = s.edit {
        let mut elst = 1u32.to_be_bytes().to_vec();
        elst.extend_from_slice(&segment.to_be_bytes());
        elst.extend_from_slice(&0i32.to_be_bytes());
        elst.extend_from_slice(&[0, 1, 0, 0]);
        trak.extend(bx(b"edts", &full(b"elst", 0, repeat as u32, &elst)));
    }

    let mut stsd = 1u32.to_be_bytes().to_vec();
    stsd.extend(sample_entry(s.width as u16, s.height as u16));
    let mut stts = 1u32.to_be_bytes().to_vec();
    stts.extend_from_slice(&s.frames.to_be_bytes());
    stts.extend_from_slice(&1u32.to_be_bytes());
    let mut stsz = 10u32.to_be_bytes().to_vec();
    stsz.extend_from_slice(&s.frames.to_be_bytes());

    let mut stbl = full(b"stsd", 0, 0, &stsd);
    stbl.extend(full(b"stts", 0, 0, &stts));
    stbl.extend(full(b"stsz", 0, 0, &stsz));

    let minf = bx(b"stbl", &stbl);
    let mut mdia = hdlr(b"pict");
    mdia.extend(bx(b"minf", &minf));
    trak.extend(bx(b"mdia", &mdia));

    let mut file = ftyp(b"avis", &[b"avif", b"msf1", b"miaf"]);
    file.extend(bx(b"moov", &bx(b"trak", &trak)));
    file.extend(bx(b"mdat", &vec![0u8; 10 * s.frames as usize]));
    file
}

/// `avis` file whose single `pict` track holds `trak_extra` followed by a
/// media box whose sample description lists only `entry`.
pub fn track_with_sample_entry(trak_extra: &[u8], entry: &[u8]) -> Vec<u8> {
    let mut stsd = 1u32.to_be_bytes().to_vec();
    stsd.extend_from_slice(entry);
    let mut mdia = hdlr(b"pict");
    mdia.extend(bx(b"minf", &bx(b"stbl", &full(b"stsd", 0, 0, &stsd))));

    let mut trak = trak_extra.to_vec();
    trak.extend(bx(b"mdia", &mdia));

    let mut file = ftyp(b"avis", &[b"avif", b"msf1"]);
    file.extend(bx(b"moov", &bx(b"trak", &trak)));
    file
}
