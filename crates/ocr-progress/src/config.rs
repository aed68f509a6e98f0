//! Project layout and viewer configuration.
//!
//! The viewer runs from a project root containing `.ocr/`. Optional tuning
//! lives in `.ocr/progress.toml`:
//!
//! ```toml
//! tick_interval_ms = 1000
//! debounce_ms = 50
//! watch_depth = 4
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ProgressError, Result};

/// Directory holding everything OCR installs into a project.
pub const OCR_DIR: &str = ".ocr";
pub const SKILLS_DIR: &str = "skills";
pub const SESSIONS_DIR: &str = "sessions";
pub const CONFIG_FILE: &str = "progress.toml";

// ============================================================================
// Paths
// ============================================================================

/// Resolved `.ocr` layout for one project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrPaths {
    pub root: PathBuf,
    pub ocr_dir: PathBuf,
    pub skills_dir: PathBuf,
    pub sessions_dir: PathBuf,
}

impl OcrPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let ocr_dir = root.join(OCR_DIR);
        Self {
            skills_dir: ocr_dir.join(SKILLS_DIR),
            sessions_dir: ocr_dir.join(SESSIONS_DIR),
            ocr_dir,
            root,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.ocr_dir.join(CONFIG_FILE)
    }

    pub fn session_dir(&self, name: &str) -> PathBuf {
        self.sessions_dir.join(name)
    }

    /// True when both `.ocr` and `.ocr/skills` exist.
    pub fn is_set_up(&self) -> bool {
        self.ocr_dir.is_dir() && self.skills_dir.is_dir()
    }

    /// Fails with [`ProgressError::SetupMissing`] unless OCR is installed.
    pub fn require_setup(&self) -> Result<()> {
        if self.is_set_up() {
            return Ok(());
        }
        Err(ProgressError::SetupMissing {
            root: self.root.clone(),
            partial: self.ocr_dir.is_dir(),
        })
    }

    /// Creates `.ocr/sessions` if needed and returns it.
    pub fn ensure_sessions_dir(&self) -> Result<&Path> {
        if !self.sessions_dir.is_dir() {
            fs::create_dir_all(&self.sessions_dir)?;
            info!(dir = %self.sessions_dir.display(), "Created sessions directory");
        }
        Ok(&self.sessions_dir)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProgressConfig {
    /// Periodic refresh, keeps the elapsed timer moving.
    pub tick_interval_ms: u64,
    /// Trailing-edge coalescing window for refresh triggers.
    pub debounce_ms: u64,
    /// Events deeper than this below the session directory are ignored.
    pub watch_depth: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            debounce_ms: 50,
            watch_depth: 4,
        }
    }
}

impl ProgressConfig {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No progress config, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self = toml::from_str(&content).map_err(|source| ProgressError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            tick_interval_ms = config.tick_interval_ms,
            debounce_ms = config.debounce_ms,
            watch_depth = config.watch_depth,
            "Loaded progress config"
        );
        Ok(config)
    }

    /// The tick interval, never shorter than one millisecond.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
