//! Structured error taxonomy shared across the ensemble crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RunNumber;

/// Machine readable detail carried by every [`EnsembleError`].
///
/// `code` is stable across releases (`table-dimension`, `runlog-append`, ...);
/// `context` holds the run number, path or line the failure refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable kebab-case error code.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// Paths, run numbers and line numbers involved.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Suggested remedy, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with no context.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records `key = value`, replacing an earlier value for `key`.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches a remedy.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Context value for `key`.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        let mut fields = self.context.iter();
        if let Some((key, value)) = fields.next() {
            write!(f, " ({key}={value}")?;
            for (key, value) in fields {
                write!(f, ", {key}={value}")?;
            }
            write!(f, ")")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "; hint: {hint}")?;
        }
        Ok(())
    }
}

/// Canonical error type for ensemble generation and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum EnsembleError {
    /// The parameter table (or a replayed run log) is not a rectangular numeric table.
    #[error("malformed table: {0}")]
    MalformedTable(ErrorInfo),
    /// The run log could not be created, appended to or flushed.
    #[error("run log write failed: {0}")]
    LogWrite(ErrorInfo),
    /// Artifact generation or diagnostic rendering failed for a single run.
    #[error("preparation failed: {0}")]
    Preparation(ErrorInfo),
    /// A run descriptor was driven through an illegal lifecycle transition.
    #[error("invalid state: {0}")]
    InvalidState(ErrorInfo),
    /// Filesystem failures outside the run log and per-run artifacts.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl EnsembleError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            EnsembleError::MalformedTable(info)
            | EnsembleError::LogWrite(info)
            | EnsembleError::Preparation(info)
            | EnsembleError::InvalidState(info)
            | EnsembleError::Io(info)
            | EnsembleError::Serde(info) => info,
        }
    }

    /// Returns true when the error must abort the whole ensemble.
    ///
    /// Only [`EnsembleError::Preparation`] is scoped to a single run; every
    /// other family touches shared setup or indicates a logic bug.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EnsembleError::Preparation(_))
    }

    /// Builds an [`EnsembleError::InvalidState`] for an illegal transition.
    pub fn invalid_transition(run: RunNumber, from: impl Display, to: impl Display) -> Self {
        EnsembleError::InvalidState(
            ErrorInfo::new("invalid-transition", format!("cannot move run from {from} to {to}"))
                .with_context("run_number", run.to_string())
                .with_context("from", from.to_string())
                .with_context("to", to.to_string()),
        )
    }

    /// Wraps an I/O failure encountered while generating a run's artifacts.
    pub fn preparation(run: RunNumber, code: &str, err: impl ToString) -> Self {
        EnsembleError::Preparation(
            ErrorInfo::new(code, err.to_string()).with_context("run_number", run.to_string()),
        )
    }
}
