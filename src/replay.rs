use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;

use csv::{Writer, WriterBuilder};

use crate::cache::{Cache, RunCounters};
use crate::error::SimError;
use crate::trace::{Operation, Trace, TraceRecord};

/// Hits, misses and evictions caused by a single trace record.
pub type RecordOutcome = RunCounters;

/// Final totals of a run, displayed as `hits:<n> misses:<n> evictions:<n>`.
pub type Summary = RunCounters;

impl RunCounters {
    /// Verbose trace line: `text`, then " miss", " eviction" and one " hit" per hit.
    pub fn annotate(&self, text: &str) -> String {
        let mut line = text.to_string();
        if self.misses > 0 {
            line.push_str(" miss");
        }
        if self.evictions > 0 {
            line.push_str(" eviction");
        }
        for _ in 0..self.hits {
            line.push_str(" hit");
        }
        line
    }
}

/// Replay one record against the cache. Instruction fetches are skipped and
/// yield `None`.
pub fn replay_record(
    cache: &mut Cache,
    counters: &mut RunCounters,
    record: &TraceRecord,
) -> Option<RecordOutcome> {
    let accesses = match record.op {
        Operation::Instruction => return None,
        Operation::Load | Operation::Store => 1,
        Operation::Modify => 2,
    };

    let mut outcome = RecordOutcome::default();
    for _ in 0..accesses {
        outcome.record(cache.access(record.address, counters));
    }
    Some(outcome)
}

/// Receives every simulated record together with what it did.
pub trait RecordSink {
    fn record(&mut self, record: &TraceRecord, outcome: &RecordOutcome) -> Result<(), SimError>;

    fn finish(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

/// Writes the annotated trace line of each record.
pub struct VerboseSink<W: Write> {
    out: W,
}

impl<W: Write> VerboseSink<W> {
    pub fn new(out: W) -> Self {
        VerboseSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for VerboseSink<W> {
    fn record(&mut self, record: &TraceRecord, outcome: &RecordOutcome) -> Result<(), SimError> {
        writeln!(self.out, "{}", outcome.annotate(&record.text))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SimError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Per-record CSV export: `op,address,size,hits,misses,evictions`.
pub struct Report<W: Write> {
    writer: Writer<W>,
}

impl Report<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let file = File::create(path)?;
        Report::new(file)
    }
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Result<Self, SimError> {
        let mut writer = WriterBuilder::new().from_writer(out);
        writer.write_record(["op", "address", "size", "hits", "misses", "evictions"])?;
        Ok(Report { writer })
    }

    pub fn into_inner(self) -> Result<W, SimError> {
        self.writer
            .into_inner()
            .map_err(|e| SimError::Io(e.into_error()))
    }
}

impl<W: Write> RecordSink for Report<W> {
    fn record(&mut self, record: &TraceRecord, outcome: &RecordOutcome) -> Result<(), SimError> {
        self.writer.write_record([
            record.op.as_char().to_string(),
            format!("{:x}", record.address),
            record.size.to_string(),
            outcome.hits.to_string(),
            outcome.misses.to_string(),
            outcome.evictions.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SimError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Replay the whole trace against `cache`, handing each simulated record to
/// every sink. Any trace or sink error ends the run without a summary.
pub fn run_trace<R: BufRead>(
    cache: &mut Cache,
    trace: Trace<R>,
    sinks: &mut [&mut dyn RecordSink],
) -> Result<Summary, SimError> {
    let mut counters = RunCounters::default();
    let mut records: u64 = 0;

    for record in trace {
        let record = record?;
        records += 1;
        let Some(outcome) = replay_record(cache, &mut counters, &record) else {
            continue;
        };
        for sink in sinks.iter_mut() {
            sink.record(&record, &outcome)?;
        }
    }

    for sink in sinks.iter_mut() {
        sink.finish()?;
    }

    tracing::info!(
        "replayed {} records: {} accesses, miss ratio {:.4}",
        records,
        counters.accesses(),
        counters.miss_ratio()
    );
    Ok(counters)
}
