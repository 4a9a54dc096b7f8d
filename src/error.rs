use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Every way a simulation run can fail. Malformed trace records are not
/// errors: they end the trace.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid cache geometry, reported before any cache is built.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The trace file could not be opened.
    #[error("{}: {source}", .path.display())]
    TraceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the trace or writing output failed mid-run.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("report error: {0}")]
    Report(#[from] csv::Error),
}
