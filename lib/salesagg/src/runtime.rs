use crate::api::{Mapper, Reducer};
use crate::config::{Measure, PipelineConfig};
use crate::constants::MAP_CHUNK_LINES;
use crate::fold::{GroupFold, OrderPolicy};
use crate::io::read_lines_lossy;
use crate::mappers::{CountMapper, RevenueMapper};
use crate::reducers::{CountReducer, RevenueReducer};
use crate::sort::sort_by_key;
use crate::stats::{MapStats, ReduceStats, StatsCollector};
use crate::wire::encode_line;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::io::{BufRead, Cursor, Write};
use std::time::Instant;
use tracing::{debug, info, trace};

/// Map every line of `input` and write wire lines to `out`.
pub fn run_map<M, R, W>(mapper: &M, mut input: R, out: &mut W) -> Result<MapStats>
where
    M: Mapper,
    R: BufRead,
    W: Write,
{
    let start = Instant::now();
    let mut stats = MapStats::default();
    let mut raw = Vec::new();
    let mut line = String::new();
    loop {
        raw.clear();
        if input.read_until(b'\n', &mut raw).context("read map input")? == 0 {
            break;
        }
        line.clear();
        line.push_str(&String::from_utf8_lossy(&raw));
        stats.lines_in += 1;
        match mapper.map_record(&line) {
            Ok((k, v)) => {
                let mut buf = String::with_capacity(k.len() + 16);
                encode_line(&mut buf, &k, &v);
                out.write_all(buf.as_bytes()).context("write map output")?;
                stats.emitted += 1;
            }
            Err(skip) => {
                trace!(line = stats.lines_in, ?skip, "record skipped");
                stats.record_skip(skip);
            }
        }
    }
    out.flush().context("flush map output")?;
    stats.wall_ms = start.elapsed().as_millis() as u64;
    info!(phase = "map", lines_in = stats.lines_in, emitted = stats.emitted, skipped = stats.skipped(),
          wall_ms = stats.wall_ms, "Map phase complete");
    Ok(stats)
}

/// Reduce a key-sorted stream of wire lines, writing one summary per group.
/// Summaries already written stay written if a later line is malformed.
pub fn run_reduce<Rd, R, W>(reducer: &Rd, mut input: R, out: &mut W, policy: OrderPolicy) -> Result<ReduceStats>
where
    Rd: Reducer,
    R: BufRead,
    W: Write,
{
    let start = Instant::now();
    let mut fold = GroupFold::new(reducer, policy);
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line).context("read reduce input")? == 0 {
            break;
        }
        let flushed = match fold.push_line(&line) {
            Ok(flushed) => flushed,
            Err(e) => {
                // Keep what was already emitted visible before failing.
                out.flush().context("flush reduce output")?;
                return Err(e.into());
            }
        };
        if let Some(summary) = flushed {
            writeln!(out, "{}", summary).context("write reduce output")?;
        }
    }
    let (last, mut stats) = fold.finish();
    if let Some(summary) = last {
        writeln!(out, "{}", summary).context("write reduce output")?;
    }
    out.flush().context("flush reduce output")?;
    stats.wall_ms = start.elapsed().as_millis() as u64;
    info!(phase = "reduce", lines_in = stats.lines_in, groups = stats.groups, summaries = stats.summaries,
          suppressed = stats.suppressed, wall_ms = stats.wall_ms, "Reduce phase complete");
    Ok(stats)
}

/// Map row partitions in parallel, sort the emissions by key, reduce them in
/// one sequential pass.
pub fn run_local<M, Rd, W>(mapper: &M, reducer: &Rd, lines: &[String], out: &mut W, policy: OrderPolicy) -> Result<StatsCollector>
where
    M: Mapper + Sync,
    Rd: Reducer,
    W: Write,
{
    let map_start = Instant::now();
    let partitions: Vec<(String, MapStats)> = lines
        .par_chunks(MAP_CHUNK_LINES)
        .enumerate()
        .map(|(task_id, chunk)| {
            let task_start = Instant::now();
            let mut stats = MapStats::default();
            let mut buf = String::new();
            for line in chunk {
                stats.lines_in += 1;
                match mapper.map_record(line) {
                    Ok((k, v)) => {
                        encode_line(&mut buf, &k, &v);
                        stats.emitted += 1;
                    }
                    Err(skip) => stats.record_skip(skip),
                }
            }
            stats.wall_ms = task_start.elapsed().as_millis() as u64;
            debug!(task_id, lines = chunk.len(), emitted = stats.emitted, "map task done");
            (buf, stats)
        })
        .collect();

    let mut map_stats = MapStats::default();
    let mut shuffled = Vec::new();
    for (buf, stats) in &partitions {
        shuffled.extend_from_slice(buf.as_bytes());
        map_stats.merge(stats);
    }
    drop(partitions);
    map_stats.wall_ms = map_start.elapsed().as_millis() as u64;
    info!(phase = "map", tasks = lines.len().div_ceil(MAP_CHUNK_LINES), lines_in = map_stats.lines_in,
          emitted = map_stats.emitted, skipped = map_stats.skipped(), wall_ms = map_stats.wall_ms, "Map phase complete");

    let (sorted, sort_stats) = sort_by_key(&shuffled);
    drop(shuffled);
    info!(phase = "sort", total_lines = sort_stats.lines_in, total_bytes = sort_stats.bytes_in,
          wall_ms = sort_stats.sort_ms, "Sort phase complete");

    let reduce_stats = run_reduce(reducer, Cursor::new(sorted), out, policy)?;
    Ok(StatsCollector { map: Some(map_stats), sort: Some(sort_stats), reduce: Some(reduce_stats) })
}

/// One dimension's mapper and reducer, wired from a [`PipelineConfig`].
#[derive(Clone, Debug)]
pub struct DimensionJob {
    config: PipelineConfig,
}

impl DimensionJob {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn revenue_mapper(&self) -> Result<RevenueMapper> {
        RevenueMapper::new(self.config.columns, self.config.format.clone())
            .with_context(|| format!("dimension {} has no revenue column", self.config.dimension))
    }

    pub fn map<R: BufRead, W: Write>(&self, input: R, out: &mut W) -> Result<MapStats> {
        debug!(dimension = %self.config.dimension, columns = ?self.config.columns, "map starting");
        match self.config.dimension.measure() {
            Measure::Count => {
                let mapper = CountMapper::new(self.config.columns, self.config.format.clone());
                run_map(&mapper, input, out)
            }
            Measure::Revenue => run_map(&self.revenue_mapper()?, input, out),
        }
    }

    pub fn reduce<R: BufRead, W: Write>(&self, input: R, out: &mut W) -> Result<ReduceStats> {
        debug!(dimension = %self.config.dimension, policy = ?self.config.order, "reduce starting");
        match self.config.dimension.measure() {
            Measure::Count => run_reduce(&CountReducer, input, out, self.config.order),
            Measure::Revenue => {
                let reducer = RevenueReducer::new(self.config.dimension.layout());
                run_reduce(&reducer, input, out, self.config.order)
            }
        }
    }

    /// Map, sort and reduce in process, on a rayon pool sized from the config.
    pub fn run_lines<W: Write + Send>(&self, lines: &[String], out: &mut W) -> Result<StatsCollector> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = self.config.threads {
            builder = builder.num_threads(n);
        } else {
            builder = builder.num_threads(num_cpus::get());
        }
        let pool = builder.build().context("build map thread pool")?;
        debug!(dimension = %self.config.dimension, threads = pool.current_num_threads(), lines = lines.len(), "run starting");
        pool.install(|| match self.config.dimension.measure() {
            Measure::Count => {
                let mapper = CountMapper::new(self.config.columns, self.config.format.clone());
                run_local(&mapper, &CountReducer, lines, out, self.config.order)
            }
            Measure::Revenue => {
                let reducer = RevenueReducer::new(self.config.dimension.layout());
                run_local(&self.revenue_mapper()?, &reducer, lines, out, self.config.order)
            }
        })
    }

    pub fn run<R: BufRead, W: Write + Send>(&self, input: R, out: &mut W) -> Result<StatsCollector> {
        let lines = read_lines_lossy(input)?;
        self.run_lines(&lines, out)
    }
}
