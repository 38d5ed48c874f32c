//! Result outputs: console log lines and the CSV result log.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::SecondsFormat;
use tracing::{info, warn};

use crate::monitoring::types::{Outcome, ProbeResult};

pub const CSV_HEADER: [&str; 4] = ["timestamp", "target URL", "response time", "status check"];

/// Emit one log line per result
pub fn log_result(result: &ProbeResult) {
    let outcome = result.outcome();
    let elapsed_ms = result.elapsed.as_millis() as u64;
    let status = result.status_code_or_zero();

    match (&result.error, outcome) {
        (Some(error), _) => warn!(url = %result.url, %outcome, status, elapsed_ms, %error, "Check result"),
        (None, Outcome::Pass) => info!(url = %result.url, %outcome, status, elapsed_ms, "Check result"),
        (None, _) => warn!(url = %result.url, %outcome, status, elapsed_ms, "Check result"),
    }
}

/// Append-only CSV log, flushed after every row
pub struct CsvLog<W: Write> {
    writer: csv::Writer<W>,
}

pub type CsvFileLog = CsvLog<File>;

impl CsvFileLog {
    /// Create (truncate) the file at `path` and write the header
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(File::create(path)?)
    }
}

impl<W: Write> CsvLog<W> {
    pub fn new(writer: W) -> io::Result<Self> {
        let mut log = Self { writer: csv::Writer::from_writer(writer) };
        log.write_row(&CSV_HEADER)?;
        Ok(log)
    }

    pub fn write_result(&mut self, result: &ProbeResult) -> io::Result<()> {
        let timestamp = result.checked_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let elapsed = format!("{:0.3}", result.elapsed.as_secs_f64());
        let passed = result.passed.to_string();

        self.write_row(&[timestamp.as_str(), result.url.as_str(), elapsed.as_str(), passed.as_str()])
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    fn write_row(&mut self, fields: &[&str]) -> io::Result<()> {
        self.writer.write_record(fields)?;
        self.writer.flush()
    }
}
