//! Set-associative cache simulator.
//!
//! Replays a memory trace of `I`/`L`/`S`/`M` records against a cache of
//! `2^s` sets with `E` lines each and `2^b`-byte blocks, using LRU
//! replacement, and counts hits, misses and evictions.

pub mod cache;
pub mod config;
pub mod error;
pub mod geometry;
pub mod replay;
pub mod trace;

use std::io::Write;
use std::time::Instant;

pub use cache::{AccessOutcome, Cache, RunCounters};
pub use config::Config;
pub use error::SimError;
pub use geometry::Geometry;
pub use replay::{run_trace, RecordOutcome, RecordSink, Report, Summary, VerboseSink};
pub use trace::{Operation, Trace, TraceRecord};

/// Run a whole simulation from a validated config. Verbose lines go to `out`,
/// the cache dump (if requested) to `dump_out`.
pub fn simulate<W: Write, D: Write>(
    config: &Config,
    out: W,
    dump_out: &mut D,
) -> Result<Summary, SimError> {
    let geometry = config.geometry;
    tracing::info!(
        "simulating {} sets x {} lines, {}-byte blocks: {}",
        geometry.set_count(),
        geometry.associativity(),
        geometry.block_size(),
        config.trace_path.display()
    );

    let mut cache = Cache::new(geometry)?;
    let trace = Trace::open(&config.trace_path)?;
    let mut report = match &config.report_path {
        Some(path) => Some(Report::create(path)?),
        None => None,
    };
    let mut verbose = VerboseSink::new(out);

    let mut sinks: Vec<&mut dyn RecordSink> = Vec::new();
    if config.verbose {
        sinks.push(&mut verbose);
    }
    if let Some(report) = report.as_mut() {
        sinks.push(report);
    }

    let start = Instant::now();
    let summary = run_trace(&mut cache, trace, &mut sinks)?;
    tracing::info!("{} in {:?}", summary, start.elapsed());

    if config.dump {
        cache.dump(dump_out)?;
    }
    Ok(summary)
}
