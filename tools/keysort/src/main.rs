use anyhow::{Context, Result};
use clap::Parser;
use memmap2::Mmap;
use salesagg::io::open_writer;
use salesagg::sort::{index_lines, sort_spans, write_spans};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Stable sort of `KEY\tVALUE` lines by key bytes: the sort barrier between
/// `sales_stats map` and `sales_stats reduce`.
#[derive(Parser, Debug)]
struct Args {
    /// Input TSV file (key\tvalue per line); stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,
    /// Output TSV file path; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

enum Source {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl Source {
    fn bytes(&self) -> &[u8] {
        match self {
            Source::Mapped(m) => &m[..],
            Source::Buffered(v) => v.as_slice(),
        }
    }
}

fn load(input: Option<&PathBuf>) -> Result<Source> {
    match input {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
            if f.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
                // Zero-length files cannot be mapped on every platform.
                return Ok(Source::Buffered(Vec::new()));
            }
            let mmap = unsafe { Mmap::map(&f) }.with_context(|| format!("mmap {}", path.display()))?;
            Ok(Source::Mapped(mmap))
        }
        None => {
            let mut buf = Vec::new();
            io::stdin().lock().read_to_end(&mut buf).context("read stdin")?;
            Ok(Source::Buffered(buf))
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
    let args = Args::parse();

    let t0 = Instant::now();
    let source = load(args.input.as_ref())?;
    let bytes = source.bytes();
    let mut lines = index_lines(bytes);
    let t_read = t0.elapsed();

    let t_sort0 = Instant::now();
    sort_spans(bytes, &mut lines);
    let t_sort = t_sort0.elapsed();

    // Write out using large BufWriter (fastest in measurements)
    let t_write0 = Instant::now();
    let mut w: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(open_writer(path)?),
        None => Box::new(io::BufWriter::with_capacity(32 * 1024 * 1024, io::stdout().lock())),
    };
    write_spans(bytes, &lines, &mut w).context("write sorted lines")?;
    w.flush().context("flush sorted lines")?;
    let t_write = t_write0.elapsed();

    info!(
        lines = lines.len(),
        bytes = bytes.len(),
        read_ms = t_read.as_millis() as u64,
        sort_ms = t_sort.as_millis() as u64,
        write_ms = t_write.as_millis() as u64,
        total_ms = t0.elapsed().as_millis() as u64,
        "keysort done"
    );

    Ok(())
}
