//! Append-only ledger mapping run numbers to parameter vectors.
//!
//! One line per run, `<run_number> <param_1> ... <param_k>\n`, written in
//! run-number order and made durable before any run is prepared. A line
//! either exists in full or the run never existed: a trailing line without
//! its newline is a torn write and is dropped on read.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use slip_core::errors::{EnsembleError, ErrorInfo};
use slip_core::{ParameterVector, RunNumber};
use tracing::{debug, warn};

use crate::table::ParameterTable;

fn log_error(code: &str, path: &Path, err: impl ToString) -> EnsembleError {
    EnsembleError::LogWrite(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Renders a single run-log line, newline included.
pub fn format_entry(run: RunNumber, params: &ParameterVector) -> String {
    if params.dim() == 0 {
        format!("{run}\n")
    } else {
        format!("{run} {}\n", params.to_log_fields())
    }
}

/// Open handle on a run log.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl RunLog {
    /// Creates (or truncates) the log at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EnsembleError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| log_error("runlog-dir", parent, err))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|err| log_error("runlog-open", path, err))?;
        debug!(path = %path.display(), "run log opened");
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Appends the entry for `run`, which must be the next run number.
    pub fn append(&mut self, run: RunNumber, params: &ParameterVector) -> Result<(), EnsembleError> {
        if run.as_raw() != self.written {
            return Err(EnsembleError::InvalidState(
                ErrorInfo::new("runlog-order", "run log entries must be appended in order")
                    .with_context("expected", self.written.to_string())
                    .with_context("run_number", run.to_string()),
            ));
        }
        self.writer
            .write_all(format_entry(run, params).as_bytes())
            .map_err(|err| log_error("runlog-append", &self.path, err))?;
        self.written += 1;
        Ok(())
    }

    /// Number of entries appended so far.
    pub fn entries(&self) -> u64 {
        self.written
    }

    /// Location of the log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and syncs the log to disk, returning its path.
    pub fn close(mut self) -> Result<PathBuf, EnsembleError> {
        self.writer
            .flush()
            .map_err(|err| log_error("runlog-flush", &self.path, err))?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|err| log_error("runlog-sync", &self.path, err))?;
        debug!(path = %self.path.display(), entries = self.written, "run log closed");
        Ok(self.path)
    }
}

/// One parsed run-log line.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLogEntry {
    /// Run number in the first column.
    pub run_number: RunNumber,
    /// Remaining columns.
    pub parameters: ParameterVector,
}

/// Reads a run log back, validating order and dimensionality.
///
/// A trailing partial line (no newline) is ignored with a warning.
pub fn read_run_log(path: &Path) -> Result<Vec<RunLogEntry>, EnsembleError> {
    let text = fs::read_to_string(path).map_err(|err| {
        EnsembleError::Io(
            ErrorInfo::new("runlog-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    let malformed = |line: usize, message: String| {
        EnsembleError::MalformedTable(
            ErrorInfo::new("runlog-parse", message)
                .with_context("path", path.display().to_string())
                .with_context("line", line.to_string()),
        )
    };

    let mut complete: Vec<&str> = text.split_inclusive('\n').collect();
    if complete.last().is_some_and(|line| !line.ends_with('\n')) {
        warn!(path = %path.display(), "dropping torn trailing run log line");
        complete.pop();
    }

    let mut entries = Vec::with_capacity(complete.len());
    for (idx, line) in complete.iter().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(head) = fields.next() else {
            return Err(malformed(idx + 1, "empty run log line".to_string()));
        };
        let run = head
            .parse::<u64>()
            .map_err(|_| malformed(idx + 1, format!("'{head}' is not a run number")))?;
        if run != idx as u64 {
            return Err(malformed(
                idx + 1,
                format!("run {run} out of order, expected {idx}"),
            ));
        }
        let values = fields
            .map(|field| {
                field
                    .parse::<f64>()
                    .map_err(|_| malformed(idx + 1, format!("'{field}' is not a number")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.push(RunLogEntry {
            run_number: RunNumber::from_raw(run),
            parameters: ParameterVector::from(values),
        });
    }

    // dimensionality check shares the table's rules
    ParameterTable::from_vectors(entries.iter().map(|entry| entry.parameters.clone()).collect())?;
    Ok(entries)
}
