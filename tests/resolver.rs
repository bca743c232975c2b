mod common;

use bmffinfo::{ColorSpace, ErrorKind, ImageInfo, ResolveOptions, default_registry, image_info};
use common::*;

fn resolve(data: &[u8]) -> ImageInfo {
    init_logs();
    image_info(data).expect("image_info failed")
}

#[test]
fn still_avif_with_codec_config() {
    let data = still_image(b"avif", 640, 480, &[av1c(8, false), nclx(6)], false);
    let info = resolve(&data);

    assert_eq!(
        info,
        ImageInfo {
            mime_type: "image/avif",
            width: 640,
            height: 480,
            color_space: Some(ColorSpace::Yuv),
            color_depth: Some(8),
            color_number: Some(3),
            has_alpha_channel: false,
            is_animation: false,
            animation_frames: None,
            animation_repeat_count: None,
        }
    );
}

#[test]
fn pixi_wins_over_codec_config() {
    let data = still_image(b"avif", 8, 8, &[av1c(8, false), pixi(&[10, 10, 10])], false);
    let info = resolve(&data);
    assert_eq!(info.color_depth, Some(10));
    assert_eq!(info.color_number, Some(3));
}

#[test]
fn identity_matrix_is_rgb() {
    let data = still_image(b"avif", 8, 8, &[av1c(12, false), nclx(0)], false);
    let info = resolve(&data);
    assert_eq!(info.color_space, Some(ColorSpace::Rgb));
    assert_eq!(info.color_depth, Some(12));
}

#[test]
fn icc_profile() {
    let data = still_image(b"avif", 8, 8, &[av1c(8, false), icc(64)], false);
    assert_eq!(resolve(&data).color_space, Some(ColorSpace::Icc));
}

#[test]
fn monochrome_is_gray() {
    let data = still_image(b"avif", 8, 8, &[av1c(10, true), nclx(6)], false);
    let info = resolve(&data);
    assert_eq!(info.color_space, Some(ColorSpace::Gray));
    assert_eq!(info.color_number, Some(1));
}

#[test]
fn no_codec_config_leaves_color_fields_empty() {
    let data = still_image(b"avif", 8, 8, &[], false);
    let info = resolve(&data);
    assert_eq!(info.color_space, None);
    assert_eq!(info.color_depth, None);
    assert_eq!(info.color_number, None);
}

#[test]
fn alpha_auxiliary_item() {
    let data = still_image(b"avif", 100, 50, &[av1c(8, false)], true);
    let info = resolve(&data);
    assert!(info.has_alpha_channel);
    assert_eq!((info.width, info.height), (100, 50));
}

#[test]
fn missing_dimensions_is_an_error() {
    let mut meta = full(b"pitm", 0, 0, &1u16.to_be_bytes());
    meta.extend(bx(b"iprp", &bx(b"ipco", &av1c(8, false))));
    let mut data = ftyp(b"avif", &[b"mif1"]);
    data.extend(full(b"meta", 0, 0, &meta));

    let err = image_info(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingProperty);
}

#[test]
fn malformed_nested_box_surfaces() {
    // ipco claims more bytes than iprp holds
    let mut ipco = 100u32.to_be_bytes().to_vec();
    ipco.extend_from_slice(b"ipco");
    let mut data = ftyp(b"avif", &[]);
    data.extend(full(b"meta", 0, 0, &bx(b"iprp", &ipco)));

    let err = image_info(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedBox);
}

#[test]
fn depth_limit() {
    let data = still_image(b"avif", 8, 8, &[], false);
    let err = default_registry()
        .image_info(&data, &ResolveOptions { max_depth: 1 })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooDeep);
}

#[test]
fn heic_with_hvcc() {
    let data = still_image(b"heic", 4032, 3024, &[hvcc(8, 1), nclx(1)], true);
    let info = resolve(&data);
    assert_eq!(info.mime_type, "image/heic");
    assert_eq!(info.color_space, Some(ColorSpace::Yuv));
    assert_eq!(info.color_depth, Some(8));
    assert!(info.has_alpha_channel);
}

#[test]
fn sequence_plays_forever() {
    let data = sequence(&Sequence {
        frames: 12,
        width: 320,
        height: 240,
        track_duration: u32::MAX,
        edit: Some((true, 12)),
    });
    let info = resolve(&data);
    assert!(info.is_animation);
    assert_eq!((info.width, info.height), (320, 240));
    assert_eq!(info.animation_frames, Some(12));
    assert_eq!(info.animation_repeat_count, Some(0));
    assert_eq!(info.color_depth, Some(10));
    assert_eq!(info.color_space, Some(ColorSpace::Yuv));
}

#[test]
fn sequence_repeat_counts() {
    let once = sequence(&Sequence {
        frames: 3,
        width: 16,
        height: 16,
        track_duration: 3,
        edit: Some((false, 3)),
    });
    assert_eq!(resolve(&once).animation_repeat_count, Some(1));

    let thrice = sequence(&Sequence {
        frames: 4,
        width: 16,
        height: 16,
        track_duration: 10,
        edit: Some((true, 4)),
    });
    assert_eq!(resolve(&thrice).animation_repeat_count, Some(3));

    let no_edit = sequence(&Sequence {
        frames: 4,
        width: 16,
        height: 16,
        track_duration: 4,
        edit: None,
    });
    let info = resolve(&no_edit);
    assert_eq!(info.animation_frames, Some(4));
    assert_eq!(info.animation_repeat_count, None);
}

#[test]
fn decode_from_file() {
    let data = still_image(b"avif", 12, 34, &[], false);
    let path = std::env::temp_dir().join(format!("bmffinfo_resolver_{}.avif", std::process::id()));
    std::fs::write(&path, &data).unwrap();

    let info = bmffinfo::image_info_file(&path);
    std::fs::remove_file(&path).unwrap();
    let info = info.unwrap();
    assert_eq!((info.width, info.height), (12, 34));

    let missing = bmffinfo::image_info_file(path.with_extension("missing")).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Io);
}

#[test]
fn sample_entry_size_is_used_without_track_header() {
    let data = track_with_sample_entry(&[], &sample_entry(64, 48));
    let info = resolve(&data);
    assert!(info.is_animation);
    assert_eq!((info.width, info.height), (64, 48));
    assert_eq!(info.color_depth, Some(10));
}

#[test]
fn non_visual_sample_entries_are_skipped() {
    init_logs();
    // container and full-box codes must not be read as visual entries
    for typ in [b"trak", b"meta", b"iinf", b"mp4a"] {
        let data = track_with_sample_entry(&[], &bx(typ, &[]));
        let err = image_info(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingProperty, "entry '{}'", String::from_utf8_lossy(typ));
    }
}

#[test]
fn short_visual_sample_entry_is_truncated() {
    init_logs();
    for len in [0, 20, 26, 27, 77] {
        let data = track_with_sample_entry(&[], &bx(b"av01", &vec![0u8; len]));
        let err = image_info(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedPayload, "payload of {len} bytes");
    }
}

#[test]
fn truncated_track_header() {
    init_logs();
    let tkhd = full(b"tkhd", 0, 3, &[0u8; 10]);
    let data = track_with_sample_entry(&tkhd, &sample_entry(8, 8));
    let err = image_info(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedPayload);
}

#[test]
fn truncated_edit_list() {
    init_logs();
    // one entry announced, segment duration missing
    let elst = full(b"elst", 0, 1, &1u32.to_be_bytes());
    let data = track_with_sample_entry(&bx(b"edts", &elst), &sample_entry(8, 8));
    let err = image_info(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedPayload);
}

#[test]
fn truncated_item_associations() {
    init_logs();
    // two entries announced, one present
    let mut assoc = 2u32.to_be_bytes().to_vec();
    assoc.extend_from_slice(&1u16.to_be_bytes());
    assoc.extend_from_slice(&[1, 1]);
    let mut iprp = bx(b"ipco", &ispe(8, 8));
    iprp.extend(full(b"ipma", 0, 0, &assoc));

    let mut meta = full(b"pitm", 0, 0, &1u16.to_be_bytes());
    meta.extend(bx(b"iprp", &iprp));
    let mut data = ftyp(b"avif", &[]);
    data.extend(full(b"meta", 0, 0, &meta));

    let err = image_info(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedPayload);
}
