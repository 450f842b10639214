//! Outcome classification and the results sink.
//!
//! The [`Recorder`] is the only place run counters change. It is driven by
//! the single completion consumer, so neither the counters nor the sink need
//! any locking.

use crate::error::StressError;
use crate::types::{Outcome, OutputRecord, RunState};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Header row of the results file.
pub const CSV_HEADER: [&str; 3] = ["Domain", "Reputation", "Categories"];

/// Append-only destination for output records.
pub trait OutcomeSink {
    /// Append one record. Implementations must make the record durable
    /// before returning.
    fn write_record(&mut self, record: &OutputRecord) -> Result<(), StressError>;

    /// Push anything still buffered to the destination.
    fn flush(&mut self) -> Result<(), StressError> {
        Ok(())
    }
}

/// CSV sink flushing after every row, so an aborted run leaves a valid file.
///
/// Rows are terminated with CRLF.
pub struct CsvSink<W: Write> {
    writer: W,
    path: Option<PathBuf>,
}

impl CsvSink<BufWriter<File>> {
    /// Create a new results file at `path` and write the header.
    ///
    /// Fails if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StressError> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                StressError::output(format!(
                    "Cannot create results file '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        let mut sink = Self::new(BufWriter::new(file))?;
        sink.path = Some(path.to_path_buf());
        Ok(sink)
    }
}

impl<W: Write> CsvSink<W> {
    /// Wrap a writer and write the header row.
    pub fn new(writer: W) -> Result<Self, StressError> {
        let mut sink = Self { writer, path: None };
        sink.write_row(&CSV_HEADER)?;
        Ok(sink)
    }

    /// Path of the underlying file, when created with [`CsvSink::create`].
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_row(&mut self, fields: &[&str]) -> Result<(), StressError> {
        let line = fields
            .iter()
            .map(|f| escape_csv_field(f))
            .collect::<Vec<_>>()
            .join(",");

        write!(self.writer, "{}\r\n", line)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> OutcomeSink for CsvSink<W> {
    fn write_record(&mut self, record: &OutputRecord) -> Result<(), StressError> {
        let reputation = render_value(record.reputation.as_ref());
        let categories = render_value(record.categories.as_ref());
        self.write_row(&[
            record.target.as_str(),
            reputation.as_str(),
            categories.as_str(),
        ])
    }

    fn flush(&mut self) -> Result<(), StressError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Sink keeping records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<OutputRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutcomeSink for MemorySink {
    fn write_record(&mut self, record: &OutputRecord) -> Result<(), StressError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Output row for an outcome, if it gets one.
///
/// Successes carry the verdict fields, soft failures a row of nulls, and
/// hard failures no row at all.
pub fn output_record(outcome: &Outcome) -> Option<OutputRecord> {
    match outcome {
        Outcome::Success { target, verdict } => Some(OutputRecord {
            target: target.clone(),
            reputation: verdict.reputation.clone(),
            categories: verdict.categories.clone(),
        }),
        Outcome::SoftFailure { target, .. } => Some(OutputRecord {
            target: target.clone(),
            reputation: None,
            categories: None,
        }),
        Outcome::HardFailure { .. } => None,
    }
}

/// Applies outcomes to the run counters and the sink.
pub struct Recorder<'a, S: OutcomeSink + ?Sized> {
    sink: &'a mut S,
    state: RunState,
}

impl<'a, S: OutcomeSink + ?Sized> Recorder<'a, S> {
    pub fn new(sink: &'a mut S, state: RunState) -> Self {
        Self { sink, state }
    }

    /// Record one observed outcome.
    ///
    /// # Errors
    ///
    /// Only sink failures are returned; they are fatal to the run.
    pub fn record(&mut self, outcome: Outcome) -> Result<(), StressError> {
        match &outcome {
            Outcome::Success { target, .. } => {
                debug!(%target, "lookup succeeded");
                self.state.successful_count += 1;
            }
            Outcome::SoftFailure { target, error } => {
                debug!(%target, %error, "lookup reported an error");
                self.state.failed_count += 1;
                self.state.soft_failed_count += 1;
            }
            Outcome::HardFailure { target, error } => {
                warn!(%target, %error, "lookup could not be observed");
                self.state.failed_count += 1;
                self.state.hard_failed_count += 1;
            }
        }

        if let Some(record) = output_record(&outcome) {
            self.sink.write_record(&record)?;
            self.state.records_written += 1;
        }

        Ok(())
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Flush the sink once the run is over.
    pub fn flush(&mut self) -> Result<(), StressError> {
        self.sink.flush()
    }

    pub fn into_state(self) -> RunState {
        self.state
    }
}

/// Render a JSON value as a CSV cell: strings verbatim, null as empty,
/// anything else as compact JSON.
fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
