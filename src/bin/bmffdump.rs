use anyhow::Context;
use bmffinfo::{
    FourCC, JsonBox, get_boxes,
    util::{byte_range, hex_dump},
};
use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(version, about = "Strict ISOBMFF box explorer (AVIF, HEIC, MP4)")]
struct Args {
    /// Container file path
    path: String,

    /// Only print subtree(s) matching a dotted path (e.g. meta.iprp.ipco)
    #[arg(long = "filter")]
    filter: Option<String>,

    /// Dump raw payload of this 4CC (e.g. --raw av1C)
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Limit recursion depth
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Print payload summaries when a reader exists
    #[arg(long, action = ArgAction::SetTrue)]
    decode: bool,

    /// Show bytes count when dumping raw (0 means entire box payload)
    #[arg(long, default_value_t = 0)]
    bytes: usize,

    /// Emit JSON instead of human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let data = std::fs::read(&args.path).with_context(|| format!("reading {}", args.path))?;
    let top = get_boxes(&data, args.decode, args.max_depth)
        .with_context(|| format!("walking {}", args.path))?;

    let targets: Vec<&JsonBox> = if let Some(path) = &args.filter {
        select_by_path(&top, path)
    } else {
        top.iter().collect()
    };

    // JSON mode: output JSON and exit (no tree or raw to keep output clean)
    if args.json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
        return Ok(());
    }

    for b in &targets {
        print_box(b, 0);
    }

    if let Some(sel) = args.raw.as_ref() {
        let fourcc = FourCC::from_str(sel)
            .with_context(|| format!("--raw expects a four character code, got '{}'", sel))?;
        dump_raw(&data, &top, fourcc, args.bytes);
    }

    Ok(())
}

// ---------- Human-readable tree ----------

fn print_box(b: &JsonBox, depth: usize) {
    let indent = "  ".repeat(depth);
    let head = format!("{indent}{:>6} {:>10} {}", format!("{:#x}", b.offset), b.size, b.typ);
    match (&b.children, b.version, b.flags) {
        (Some(kids), _, _) => {
            println!("{head} (container)");
            for c in kids {
                print_box(c, depth + 1);
            }
        }
        (None, Some(version), Some(flags)) => {
            println!("{head} (ver={}, flags=0x{:06x})", version, flags);
        }
        _ => println!("{head}"),
    }
    if let Some(s) = &b.decoded {
        println!("{indent}        -> {}", s);
    }
}

// ---------- Raw dump ----------

fn dump_raw(data: &[u8], boxes: &[JsonBox], sel: FourCC, limit: usize) {
    let mut matches = Vec::new();
    select_boxes(boxes, &sel.to_string(), &mut matches);
    for (i, b) in matches.into_iter().enumerate() {
        let len = if limit == 0 { b.payload_size } else { b.payload_size.min(limit as u64) };
        let bytes = byte_range(data, b.payload_offset, len);
        println!(
            "\n== Dump {} ({}) payload: offset={:#x}, len={} ==",
            i,
            b.typ,
            b.payload_offset,
            bytes.len()
        );
        print!("{}", hex_dump(bytes, b.payload_offset));
    }
}

fn select_boxes<'a>(list: &'a [JsonBox], sel: &str, out: &mut Vec<&'a JsonBox>) {
    for b in list {
        if b.typ == sel {
            out.push(b);
        }
        if let Some(kids) = &b.children {
            select_boxes(kids, sel, out);
        }
    }
}

// ---------- Filter path: meta.iprp.ipco[0] ----------

fn select_by_path<'a>(roots: &'a [JsonBox], path: &str) -> Vec<&'a JsonBox> {
    let mut current: Vec<&'a JsonBox> = Vec::new();

    for (depth, seg) in path.split('.').enumerate() {
        let (name, idx) = parse_segment(seg);
        let candidates: Vec<&'a JsonBox> = if depth == 0 {
            roots.iter().collect()
        } else {
            current
                .iter()
                .copied()
                .filter_map(|b| b.children.as_ref())
                .flatten()
                .collect()
        };
        let matches: Vec<&'a JsonBox> = candidates.into_iter().filter(|b| b.typ == name).collect();

        current = match idx {
            Some(i) => matches.get(i).copied().into_iter().collect(),
            None => matches,
        };
        if current.is_empty() {
            break;
        }
    }

    current
}

fn parse_segment(seg: &str) -> (&str, Option<usize>) {
    if let Some(l) = seg.find('[') {
        let name = &seg[..l];
        if let Some(r) = seg[l + 1..].find(']') {
            let idx_str = &seg[l + 1..l + 1 + r];
            let idx = idx_str.parse::<usize>().ok();
            return (name, idx);
        }
        (name, None)
    } else {
        (seg, None)
    }
}
