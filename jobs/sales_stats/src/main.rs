use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use salesagg::io::{open_writer, read_inputs};
use salesagg::stats::StatsCollector;
use salesagg::{Dimension, DimensionJob, Overrides, PipelineConfig};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Grouped order counts and revenue statistics over sales CSV records.
///
/// `map` and `reduce` are stream filters for an external sort:
///   sales_stats map country < sales.csv | keysort | sales_stats reduce country
#[derive(Parser, Debug)]
#[command(name = "sales_stats", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
    #[command(flatten)]
    opts: CommonOpts,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Records on stdin -> `KEY\tVALUE` lines on stdout
    Map { dimension: Dimension },
    /// Key-sorted `KEY\tVALUE` lines on stdin -> one summary per key on stdout
    Reduce { dimension: Dimension },
    /// Map, sort and reduce in process
    Run {
        dimension: Dimension,
        /// Input files or directories (read recursively); stdin when omitted
        #[arg(long)]
        input: Vec<PathBuf>,
        /// Output file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct CommonOpts {
    /// Field delimiter of input records (single character, or `tab`)
    #[arg(long, global = true)]
    delimiter: Option<String>,
    /// Lines starting with this prefix are treated as the header
    #[arg(long, global = true)]
    header_prefix: Option<String>,
    /// Zero-based column holding the grouping key
    #[arg(long, global = true)]
    key_column: Option<usize>,
    /// Zero-based column holding the revenue (revenue dimensions only)
    #[arg(long, global = true)]
    revenue_column: Option<usize>,
    /// Records with fewer fields are skipped
    #[arg(long, global = true)]
    min_fields: Option<usize>,
    /// Start a new group when a key reappears instead of failing
    #[arg(long, global = true)]
    allow_unsorted: bool,
    /// Worker threads for `run`
    #[arg(long, global = true)]
    threads: Option<usize>,
    /// Print phase counters as JSON on stderr
    #[arg(long, global = true)]
    stats_json: bool,
    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

impl CommonOpts {
    fn overrides(&self) -> Overrides {
        Overrides {
            delimiter: self.delimiter.clone(),
            header_prefix: self.header_prefix.clone(),
            key_column: self.key_column,
            revenue_column: self.revenue_column,
            min_fields: self.min_fields,
            allow_unsorted: self.allow_unsorted,
            threads: self.threads,
        }
    }
}

fn build_job(dimension: Dimension, opts: &CommonOpts) -> Result<DimensionJob> {
    let config = PipelineConfig::from_env(dimension)?
        .apply(&opts.overrides())
        .with_context(|| format!("configure {dimension}"))?;
    Ok(DimensionJob::new(config))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.opts.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let mut stats = StatsCollector::new();
    match &args.command {
        Command::Map { dimension } => {
            let job = build_job(*dimension, &args.opts)?;
            let mut out = BufWriter::new(io::stdout());
            stats.map = Some(job.map(io::stdin().lock(), &mut out)?);
        }
        Command::Reduce { dimension } => {
            let job = build_job(*dimension, &args.opts)?;
            let mut out = BufWriter::new(io::stdout());
            stats.reduce = Some(job.reduce(io::stdin().lock(), &mut out)?);
        }
        Command::Run { dimension, input, output } => {
            let job = build_job(*dimension, &args.opts)?;
            let mut out: Box<dyn Write + Send> = match output {
                Some(path) => Box::new(open_writer(path)?),
                None => Box::new(BufWriter::new(io::stdout())),
            };
            stats = if input.is_empty() {
                job.run(io::stdin().lock(), &mut out)?
            } else {
                let lines = read_inputs(input)?;
                info!(inputs = input.len(), lines = lines.len(), "inputs loaded");
                job.run_lines(&lines, &mut out)?
            };
            out.flush().context("flush output")?;
        }
    }

    if args.opts.stats_json {
        eprintln!("{}", stats.to_json()?);
    }
    Ok(())
}
