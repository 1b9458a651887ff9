use crate::stats::SortStats;
use memchr::memchr;
use rayon::prelude::*;
use std::io::{self, Write};
use std::time::Instant;

/// One `KEY\tVALUE` line inside a byte buffer: `[start..key_end)` is the key,
/// `[start..end)` the line without its terminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub key_end: usize,
    pub end: usize,
}

// Build line index, dropping empty lines and trailing `\r`.
pub fn index_lines(bytes: &[u8]) -> Vec<LineSpan> {
    let mut lines = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let nl = memchr(b'\n', &bytes[offset..]).map(|i| offset + i + 1).unwrap_or(bytes.len());
        let mut end = nl;
        if end > offset && bytes[end - 1] == b'\n' { end -= 1; }
        if end > offset && bytes[end - 1] == b'\r' { end -= 1; }
        if end > offset {
            let key_end = memchr(b'\t', &bytes[offset..end]).map(|i| offset + i).unwrap_or(end);
            lines.push(LineSpan { start: offset, key_end, end });
        }
        offset = nl;
    }
    lines
}

/// Stable sort by key bytes; lines with equal keys keep their input order.
pub fn sort_spans(bytes: &[u8], spans: &mut [LineSpan]) {
    spans.par_sort_by(|a, b| bytes[a.start..a.key_end].cmp(&bytes[b.start..b.key_end]));
}

pub fn write_spans<W: Write>(bytes: &[u8], spans: &[LineSpan], w: &mut W) -> io::Result<()> {
    for s in spans {
        w.write_all(&bytes[s.start..s.end])?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Sort a buffer of wire lines by key; the result is newline-terminated.
pub fn sort_by_key(bytes: &[u8]) -> (Vec<u8>, SortStats) {
    let t0 = Instant::now();
    let mut spans = index_lines(bytes);
    sort_spans(bytes, &mut spans);
    let mut out = Vec::with_capacity(bytes.len() + 1);
    // Writing into a Vec cannot fail.
    let _ = write_spans(bytes, &spans, &mut out);
    let stats = SortStats {
        lines_in: spans.len() as u64,
        bytes_in: bytes.len() as u64,
        sort_ms: t0.elapsed().as_millis() as u64,
    };
    (out, stats)
}
