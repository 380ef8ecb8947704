use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use slip_core::errors::{EnsembleError, ErrorInfo};
use slip_core::ParameterVector;

fn malformed(code: &str, message: impl Into<String>) -> EnsembleError {
    EnsembleError::MalformedTable(ErrorInfo::new(code, message))
}

/// Ordered, rectangular collection of parameter vectors (one per run).
///
/// Every row has the same dimensionality. A table with a single row is still
/// one run, never one vector per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterTable {
    rows: Vec<ParameterVector>,
}

impl ParameterTable {
    /// Validates and wraps raw rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, EnsembleError> {
        let lines: Vec<u64> = (1..=rows.len() as u64).collect();
        Self::from_numbered_rows(rows, &lines)
    }

    /// Wraps already-built vectors, checking dimensionality.
    pub fn from_vectors(rows: Vec<ParameterVector>) -> Result<Self, EnsembleError> {
        let raw = rows.iter().map(|row| row.values().to_vec()).collect();
        Self::from_rows(raw)
    }

    fn from_numbered_rows(rows: Vec<Vec<f64>>, lines: &[u64]) -> Result<Self, EnsembleError> {
        let Some(expected) = rows.first().map(Vec::len) else {
            return Ok(Self::default());
        };
        for (row, line) in rows.iter().zip(lines) {
            if row.is_empty() {
                return Err(EnsembleError::MalformedTable(
                    ErrorInfo::new("table-empty-row", "row has no parameters")
                        .with_context("line", line.to_string()),
                ));
            }
            if row.len() != expected {
                return Err(EnsembleError::MalformedTable(
                    ErrorInfo::new(
                        "table-dimension",
                        format!("row has {} columns, expected {}", row.len(), expected),
                    )
                    .with_context("line", line.to_string())
                    .with_hint("every row of the parameter table must have the same width"),
                ));
            }
        }
        Ok(Self {
            rows: rows.into_iter().map(ParameterVector::from).collect(),
        })
    }

    /// Number of runs described by the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Shared dimensionality of the rows (0 for an empty table).
    pub fn dim(&self) -> usize {
        self.rows.first().map(ParameterVector::dim).unwrap_or(0)
    }

    /// Rows in table order.
    pub fn rows(&self) -> &[ParameterVector] {
        &self.rows
    }

    /// Iterates over rows in table order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterVector> {
        self.rows.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Comma,
    Whitespace,
}

impl Dialect {
    fn detect(lines: &[String]) -> Self {
        if lines.iter().any(|line| line.contains(',')) {
            Dialect::Comma
        } else {
            Dialect::Whitespace
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            Dialect::Comma => b',',
            Dialect::Whitespace => b' ',
        }
    }
}

/// Parses a comma or whitespace delimited numeric table.
///
/// `#` starts a comment that runs to the end of the line. Blank lines are
/// skipped.
pub fn parse_table(text: &str) -> Result<ParameterTable, EnsembleError> {
    let stripped: Vec<String> = text
        .lines()
        .map(|line| {
            let data = line.split('#').next().unwrap_or("");
            data.replace('\t', " ")
        })
        .collect();
    let dialect = Dialect::detect(&stripped);
    let normalized = stripped.join("\n");

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(dialect.delimiter())
        .flexible(true)
        .trim(Trim::All)
        .from_reader(normalized.as_bytes());

    let mut rows = Vec::new();
    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| malformed("table-read", err.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        let mut row = Vec::with_capacity(record.len());
        for field in record.iter() {
            if field.is_empty() && dialect == Dialect::Whitespace {
                continue;
            }
            let value = field.parse::<f64>().map_err(|_| {
                EnsembleError::MalformedTable(
                    ErrorInfo::new("table-parse", format!("'{field}' is not a number"))
                        .with_context("line", line.to_string()),
                )
            })?;
            row.push(value);
        }
        rows.push(row);
        lines.push(line);
    }
    ParameterTable::from_numbered_rows(rows, &lines)
}

/// Loads a parameter table from disk.
pub fn load_table(path: &Path) -> Result<ParameterTable, EnsembleError> {
    let text = fs::read_to_string(path).map_err(|err| {
        EnsembleError::Io(
            ErrorInfo::new("table-open", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    parse_table(&text).map_err(|err| match err {
        EnsembleError::MalformedTable(info) => {
            EnsembleError::MalformedTable(info.with_context("path", path.display().to_string()))
        }
        other => other,
    })
}

/// Writes a table in the whitespace layout accepted by [`load_table`].
pub fn write_table(path: &Path, table: &ParameterTable) -> Result<(), EnsembleError> {
    let io_error = |err: std::io::Error| {
        EnsembleError::Io(
            ErrorInfo::new("table-write", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    for row in table.iter() {
        writeln!(writer, "{}", row.to_log_fields()).map_err(io_error)?;
    }
    writer.flush().map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_prefers_comma_when_present() {
        let lines = vec!["1.0, 2.0".to_string(), "3.0 4.0".to_string()];
        assert_eq!(Dialect::detect(&lines), Dialect::Comma);
        let lines = vec!["1.0   2.0".to_string()];
        assert_eq!(Dialect::detect(&lines), Dialect::Whitespace);
    }
}
