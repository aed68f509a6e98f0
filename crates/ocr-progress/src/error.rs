//! Error types for the progress viewer.
//!
//! Only failures that happen before the watch loop starts are surfaced as
//! errors. Inside the loop every failure degrades to "keep the last frame"
//! or a waiting frame.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Progress Error Type
// ============================================================================

/// Progress viewer errors.
///
/// Each variant maps to one message printed in red before the process exits
/// with status 1. [`ProgressError::hint`] supplies the dim follow-up line.
#[derive(Error, Debug)]
pub enum ProgressError {
    /// `.ocr` or `.ocr/skills` is missing from the project directory.
    #[error("OCR is not set up in this directory")]
    SetupMissing {
        /// The project root that was checked.
        root: PathBuf,
        /// Whether `.ocr` itself exists (only `skills` is missing).
        partial: bool,
    },

    /// The session named with `--session` does not exist.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// No strategy could be chosen for the named session.
    #[error("Cannot determine workflow type for session {0}")]
    UnknownWorkflow(String),

    /// The named session has no readable status file.
    #[error("Session {0} has no state.json - cannot track progress")]
    NoWorkflowState(String),

    /// `.ocr/progress.toml` exists but is not valid.
    #[error("Invalid configuration in {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A filesystem watcher could not be created or attached.
    #[error("Failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// I/O error passthrough.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ProgressError {
    /// A short follow-up line telling the user what to do next.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownWorkflow(_) => Some("Try specifying --workflow review or --workflow map"),
            Self::NoWorkflowState(_) => {
                Some("The orchestrating agent must create state.json for progress tracking.")
            }
            Self::SetupMissing { partial: false, .. } => Some("The .ocr directory was not found."),
            Self::SetupMissing { partial: true, .. } => {
                Some("The .ocr/skills directory is missing. OCR may have been partially installed.")
            }
            Self::SessionNotFound(_) | Self::Config { .. } | Self::Watch { .. } | Self::Io(_) => {
                None
            }
        }
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for progress viewer operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

// ============================================================================
// Tests
// ============================================================================
