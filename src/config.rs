use std::path::PathBuf;

use crate::error::SimError;
use crate::geometry::Geometry;

/// Everything a run needs, already validated.
#[derive(Debug, Clone)]
pub struct Config {
    pub geometry: Geometry,
    pub trace_path: PathBuf,
    pub verbose: bool,
    /// Where to write the per-record CSV report, if anywhere.
    pub report_path: Option<PathBuf>,
    /// Print the final cache contents after the run.
    pub dump: bool,
}

impl Config {
    pub fn new(
        set_bits: u32,
        associativity: usize,
        block_bits: u32,
        trace_path: PathBuf,
        verbose: bool,
    ) -> Result<Config, SimError> {
        Ok(Config {
            geometry: Geometry::new(set_bits, associativity, block_bits)?,
            trace_path,
            verbose,
            report_path: None,
            dump: false,
        })
    }

    pub fn with_report(mut self, path: PathBuf) -> Self {
        self.report_path = Some(path);
        self
    }

    pub fn with_dump(mut self, dump: bool) -> Self {
        self.dump = dump;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_valid_config() {
        let config = Config::new(4, 1, 4, PathBuf::from("traces/yi.trace"), true)
            .unwrap()
            .with_report(PathBuf::from("out.csv"));
        assert_eq!(config.geometry.set_count(), 16);
        assert!(config.verbose);
        assert_eq!(config.report_path, Some(PathBuf::from("out.csv")));
        assert!(!config.dump);
    }

    #[test]
    fn zero_associativity_is_rejected() {
        let err = Config::new(4, 0, 4, PathBuf::from("t"), false).unwrap_err();
        assert!(err.to_string().contains("associativity"));
    }
}
