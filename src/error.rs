//! Errors reported while retrieving, reconciling and averaging boot times.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::model::RetrievalMethod;

// =============================================================================
// Public Interface
// =============================================================================

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Flat classification of an [`Error`], independent of the context wrappers
/// added while the error travels up from a source reader.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    /// An expected artifact is absent (firmware variable, ACPI table...).
    NotFound,
    /// The artifact is present but could not be decoded.
    MalformedData,
    /// The system-management bus could not be reached.
    ConnectionError,
    /// Decoded timestamps contradict each other.
    InvariantViolation,
    /// The boot sequence has not finished yet.
    NotReady,
    /// The boot summary command produced no output.
    EmptyInput,
    /// Reading or writing a file (or running a command) failed.
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("malformed {what}: {reason}")]
    MalformedData { what: String, reason: String },

    #[error("connecting to the system bus: {0}")]
    Connection(#[source] zbus::Error),

    #[error("{0}")]
    InvariantViolation(String),

    #[error("bootup is not yet finished")]
    NotReady,

    #[error("empty output")]
    EmptyInput,

    #[error("command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error("accessing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("decoding line {line} of {}: {source}", path.display())]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("retrieving boot time with {method}: {source}")]
    Source {
        method: RetrievalMethod,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound { what: what.into() }
    }

    pub(crate) fn malformed(what: impl Into<String>, reason: impl ToString) -> Self {
        Error::MalformedData {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify the error, looking through [`Error::Source`] wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::MalformedData { .. } | Error::Json { .. } => ErrorKind::MalformedData,
            Error::Connection(_) => ErrorKind::ConnectionError,
            Error::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Error::NotReady => ErrorKind::NotReady,
            Error::EmptyInput => ErrorKind::EmptyInput,
            Error::Command { .. } | Error::Io { .. } => ErrorKind::Io,
            Error::Source { source, .. } => source.kind(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_looks_through_source_wrappers() {
        let err = Error::Source {
            method: RetrievalMethod::AcpiFirmwareTable,
            source: Box::new(Error::not_found("FPDT table")),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "retrieving boot time with acpi_fpdt: FPDT table not found"
        );
    }

    #[test]
    fn io_error_names_the_path() {
        let err = Error::io(
            "/tmp/missing.jsonl",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("/tmp/missing.jsonl"));
    }
}
