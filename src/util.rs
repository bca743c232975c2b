/// Classic 16-bytes-per-line hex dump; `start_offset` labels the first line.
pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs = chunk
            .iter()
            .map(|b| hex::encode([*b]))
            .collect::<Vec<_>>()
            .join(" ");
        let ascii: String = chunk
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}  {:<47}  |{}|\n", offs, hexs, ascii));
    }
    out
}

/// Clamp `[offset, offset + max_len)` to `buf`.
pub fn byte_range(buf: &[u8], offset: u64, max_len: u64) -> &[u8] {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(buf.len());
    let len = usize::try_from(max_len).unwrap_or(usize::MAX);
    let end = start.saturating_add(len).min(buf.len());
    &buf[start..end]
}
