use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use csim::{simulate, Config, SimError};

#[derive(Parser)]
#[command(
    name = "csim",
    version = "0.1.0",
    about = "Set-associative LRU cache simulator for memory traces"
)]
struct Cli {
    /// Number of set index bits (the cache has 2^s sets)
    #[arg(short = 's', value_name = "S")]
    set_bits: u32,

    /// Associativity, the number of lines per set
    #[arg(short = 'E', value_name = "E")]
    associativity: usize,

    /// Number of block offset bits (blocks are 2^b bytes)
    #[arg(short = 'b', value_name = "B")]
    block_bits: u32,

    /// The path of trace file
    #[arg(short = 't', value_name = "TRACE_FILE")]
    trace: PathBuf,

    /// Print each simulated record with its outcome
    #[arg(short, long)]
    verbose: bool,

    /// Write a per-record CSV report to this file
    #[arg(long, value_name = "CSV_FILE")]
    report: Option<PathBuf>,

    /// Print the final cache contents to stderr
    #[arg(long)]
    dump: bool,
}

impl Cli {
    fn into_config(self) -> Result<Config, SimError> {
        let config = Config::new(
            self.set_bits,
            self.associativity,
            self.block_bits,
            self.trace,
            self.verbose,
        )?
        .with_dump(self.dump);
        Ok(match self.report {
            Some(path) => config.with_report(path),
            None => config,
        })
    }
}

fn main() -> ExitCode {
    fmt::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let result = cli
        .into_config()
        .and_then(|config| simulate(&config, io::stdout().lock(), &mut io::stderr()));

    match result {
        Ok(summary) => {
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
