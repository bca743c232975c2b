use anyhow::Context;
use bmffinfo::{FileTypeBox, ImageInfo, ResolveOptions, default_registry};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Image properties of AVIF / HEIC files")]
struct Args {
    /// Image file path
    path: String,

    /// Output as JSON instead of human-readable text
    #[arg(long)]
    json: bool,

    /// Deepest box nesting level to follow
    #[arg(long, default_value_t = ResolveOptions::default().max_depth)]
    max_depth: usize,
}

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    format: &'static str,
    major_brand: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    compatible_brands: Vec<String>,
    #[serde(flatten)]
    info: ImageInfo,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let path = PathBuf::from(&args.path);

    let data = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let registry = default_registry();
    let decoder = registry
        .detect(&data)
        .with_context(|| format!("{} is not a supported image container", path.display()))?;

    // the first box is the validated ftyp
    let ftyp = decoder
        .decode(&data)?
        .next()
        .context("empty container")??;
    let ftyp = FileTypeBox::parse(&ftyp)?;

    let opts = ResolveOptions { max_depth: args.max_depth };
    let info = decoder
        .image_info(&data, &opts)
        .with_context(|| format!("resolving {}", path.display()))?;

    let report = FileReport {
        file: path.display().to_string(),
        format: decoder.name(),
        major_brand: ftyp.major_brand.to_string(),
        compatible_brands: ftyp.compatible_brands.iter().map(|b| b.to_string()).collect(),
        info,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_human(&report);
    }

    Ok(())
}

fn print_human(r: &FileReport) {
    let i = &r.info;
    println!("File:        {}", r.file);
    println!("Format:      {} ({})", r.format, i.mime_type);
    println!("Brand:       {} {:?}", r.major_brand, r.compatible_brands);
    println!("Dimensions:  {}x{}", i.width, i.height);
    if let Some(cs) = i.color_space {
        println!("Color space: {}", cs);
    }
    if let Some(d) = i.color_depth {
        println!("Bit depth:   {}", d);
    }
    if let Some(n) = i.color_number {
        println!("Channels:    {}", n);
    }
    println!("Alpha:       {}", if i.has_alpha_channel { "yes" } else { "no" });
    if i.is_animation {
        let frames = i.animation_frames.map_or("?".to_string(), |f| f.to_string());
        let repeat = match i.animation_repeat_count {
            Some(0) => "forever".to_string(),
            Some(n) => format!("{} time(s)", n),
            None => "?".to_string(),
        };
        println!("Animation:   {} frames, plays {}", frames, repeat);
    } else {
        println!("Animation:   no");
    }
}
