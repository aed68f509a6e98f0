//! Error types for reading session artifacts.
//!
//! None of these escape the progress pipeline as failures: callers log them
//! and fall back to "no state yet". They exist so the fallback sites can say
//! *why* a status file was skipped.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a session's `state.json`.
#[derive(Error, Debug)]
pub enum StateFileError {
    /// No status file has been written yet.
    #[error("status file not found: {}", path.display())]
    Missing { path: PathBuf },

    /// The file exists but could not be read (permissions, mid-write race).
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not a valid status record.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A workflow kind string that names no known workflow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid workflow type: {value}. Use 'review' or 'map'.")]
pub struct ParseKindError {
    pub value: String,
}

/// Result type for status file operations.
pub type StateFileResult<T> = Result<T, StateFileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_display_includes_path() {
        let error = StateFileError::Missing {
            path: PathBuf::from("/tmp/s/state.json"),
        };
        assert!(error.to_string().contains("/tmp/s/state.json"));
    }

    #[test]
    fn test_parse_kind_error_display() {
        let error = ParseKindError {
            value: "deploy".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid workflow type: deploy. Use 'review' or 'map'."
        );
    }
}
