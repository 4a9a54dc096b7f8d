use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Instruction fetch, never simulated.
    Instruction,
    Load,
    Store,
    /// Load followed by a store to the same address.
    Modify,
}

impl Operation {
    fn from_char(c: char) -> Option<Operation> {
        match c {
            'I' => Some(Operation::Instruction),
            'L' => Some(Operation::Load),
            'S' => Some(Operation::Store),
            'M' => Some(Operation::Modify),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Operation::Instruction => 'I',
            Operation::Load => 'L',
            Operation::Store => 'S',
            Operation::Modify => 'M',
        }
    }
}

/// One `<op> <hex-address>,<size>` line of a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub op: Operation,
    pub address: u64,
    /// Access width in bytes. Parsed but not simulated.
    pub size: u64,
    /// The line as read, without surrounding whitespace.
    pub text: String,
}

impl TraceRecord {
    pub fn new(op: Operation, address: u64, size: u64) -> TraceRecord {
        TraceRecord {
            op,
            address,
            size,
            text: format!("{} {:x},{}", op.as_char(), address, size),
        }
    }

    /// Parse a trace line, `None` if it does not match the record format.
    pub fn parse(line: &str) -> Option<TraceRecord> {
        let text = line.trim();
        let mut chars = text.chars();
        let op = Operation::from_char(chars.next()?)?;

        let rest = chars.as_str();
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let (address, size) = rest.trim_start().split_once(',')?;

        Some(TraceRecord {
            op,
            address: parse_digits(address, 16)?,
            size: parse_digits(size, 10)?,
            text: text.to_string(),
        })
    }
}

/// `from_str_radix` also takes a leading sign, which the trace format does not.
fn parse_digits(digits: &str, radix: u32) -> Option<u64> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// Lazy reader over the records of a trace. Stops at end of input or at the
/// first line that is not a valid record, including lines that are not UTF-8.
pub struct Trace<R> {
    reader: R,
    buf: Vec<u8>,
    done: bool,
}

impl Trace<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SimError::TraceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Trace::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Trace<R> {
    pub fn new(reader: R) -> Self {
        Trace {
            reader,
            buf: Vec::new(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for Trace<R> {
    type Item = Result<TraceRecord, SimError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.buf.clear();
        let item = match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => std::str::from_utf8(&self.buf)
                .ok()
                .and_then(TraceRecord::parse)
                .map(Ok),
            Err(e) => Some(Err(SimError::Io(e))),
        };
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}
