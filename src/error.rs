//! Error types for the evaluation pipeline

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while evaluating nutrition estimates
///
/// Only [`SchemaMismatch`](EvaluationError::SchemaMismatch),
/// [`InvalidConfig`](EvaluationError::InvalidConfig), [`Io`](EvaluationError::Io) and
/// [`Csv`](EvaluationError::Csv) abort a run. The remaining variants are raised per
/// observation and turned into null cells by the stage that encounters them.
#[derive(Debug, Clone)]
pub enum EvaluationError {
    /// A result JSON file does not exist
    MissingFile(PathBuf),

    /// A result JSON file (or table cell) could not be parsed
    MalformedData {
        /// Offending file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Too few paired observations for a statistical test
    InsufficientSample {
        /// Minimum number of observations the test needs
        required: usize,
        /// Number of observations available
        found: usize,
    },

    /// Tabular input does not have the expected shape
    SchemaMismatch(String),

    /// Configuration rejected by validation
    InvalidConfig(String),

    /// Filesystem error
    Io(String),

    /// CSV reader/writer error
    Csv(String),
}

impl EvaluationError {
    /// Whether the pipeline continues after this error (null-filling the affected output)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EvaluationError::MissingFile(_)
                | EvaluationError::MalformedData { .. }
                | EvaluationError::InsufficientSample { .. }
        )
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationError::MissingFile(path) => write!(f, "Missing file: {}", path.display()),
            EvaluationError::MalformedData { path, reason } => {
                write!(f, "Malformed data in {}: {}", path.display(), reason)
            }
            EvaluationError::InsufficientSample { required, found } => write!(
                f,
                "Insufficient sample: {} observations required, {} available",
                required, found
            ),
            EvaluationError::SchemaMismatch(msg) => write!(f, "Schema mismatch: {}", msg),
            EvaluationError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            EvaluationError::Io(msg) => write!(f, "I/O error: {}", msg),
            EvaluationError::Csv(msg) => write!(f, "CSV error: {}", msg),
        }
    }
}

impl std::error::Error for EvaluationError {}

impl From<std::io::Error> for EvaluationError {
    fn from(err: std::io::Error) -> Self {
        EvaluationError::Io(err.to_string())
    }
}

impl From<csv::Error> for EvaluationError {
    fn from(err: csv::Error) -> Self {
        EvaluationError::Csv(err.to_string())
    }
}

impl From<walkdir::Error> for EvaluationError {
    fn from(err: walkdir::Error) -> Self {
        EvaluationError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_variants() {
        assert!(EvaluationError::MissingFile(PathBuf::from("a.json")).is_recoverable());
        assert!(EvaluationError::MalformedData {
            path: PathBuf::from("a.json"),
            reason: "eof".to_string(),
        }
        .is_recoverable());
        assert!(EvaluationError::InsufficientSample { required: 2, found: 1 }.is_recoverable());
        assert!(!EvaluationError::SchemaMismatch("3 columns".to_string()).is_recoverable());
        assert!(!EvaluationError::Io("denied".to_string()).is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = EvaluationError::InsufficientSample { required: 10, found: 4 };
        assert_eq!(
            err.to_string(),
            "Insufficient sample: 10 observations required, 4 available"
        );
    }
}
