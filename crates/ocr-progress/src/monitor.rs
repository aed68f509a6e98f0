//! Session focus and frame selection for the watch loop.
//!
//! A [`Monitor`] decides, on every pass, which session to show and which
//! frame to draw for it. It does no I/O beyond reading the session
//! directory, so the whole state machine can be driven from tests with a
//! fixed clock.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ocr_core::{
    detect_active_workflows, detect_workflow_type, find_latest_active_session, is_session_active,
    Frame, Strategy, StrategyRegistry, WorkflowKind,
};
use tracing::{debug, info};

use crate::error::{ProgressError, Result};
use crate::views;

/// How the monitored session is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One named session for the whole run.
    Pinned,
    /// Follows the newest active session.
    Auto,
}

/// Focus and per-session bookkeeping for the watch loop.
#[derive(Debug)]
pub struct Monitor {
    sessions_dir: PathBuf,
    registry: StrategyRegistry,
    hint: Option<WorkflowKind>,
    mode: Mode,
    session: Option<String>,
    strategy: Option<Strategy>,
    /// First observed start time per workflow, so elapsed time never jumps.
    start_times: BTreeMap<WorkflowKind, i64>,
}

impl Monitor {
    /// Pins `name`, failing if it cannot be tracked at all.
    ///
    /// The session must exist, resolve to a registered strategy and parse
    /// once; the start time from that first parse is kept for the run.
    pub fn pinned(
        sessions_dir: impl Into<PathBuf>,
        name: &str,
        hint: Option<WorkflowKind>,
        registry: StrategyRegistry,
        now_ms: i64,
    ) -> Result<Self> {
        let sessions_dir = sessions_dir.into();
        let path = sessions_dir.join(name);
        if !path.is_dir() {
            return Err(ProgressError::SessionNotFound(name.to_string()));
        }

        let strategy = detect_workflow_type(&path, hint)
            .and_then(|kind| registry.get(kind).copied())
            .ok_or_else(|| ProgressError::UnknownWorkflow(name.to_string()))?;
        let state = strategy
            .parse_state_at(&path, None, now_ms)
            .ok_or_else(|| ProgressError::NoWorkflowState(name.to_string()))?;

        info!(session = name, kind = %strategy.kind(), "Pinned session");
        let mut start_times = BTreeMap::new();
        start_times.insert(state.kind(), state.start_time());

        Ok(Self {
            sessions_dir,
            registry,
            hint,
            mode: Mode::Pinned,
            session: Some(name.to_string()),
            strategy: Some(strategy),
            start_times,
        })
    }

    /// Follows the newest active session under `sessions_dir`.
    pub fn auto(
        sessions_dir: impl Into<PathBuf>,
        hint: Option<WorkflowKind>,
        registry: StrategyRegistry,
    ) -> Self {
        let sessions_dir = sessions_dir.into();
        let session = find_latest_active_session(&sessions_dir);
        info!(session = ?session, "Auto-detecting sessions");
        Self {
            sessions_dir,
            registry,
            hint,
            mode: Mode::Auto,
            session,
            strategy: None,
            start_times: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Name of the focused session.
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Directory of the focused session.
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session.as_ref().map(|name| self.sessions_dir.join(name))
    }

    /// Preserved start time for `kind` in the focused session.
    pub fn start_time(&self, kind: WorkflowKind) -> Option<i64> {
        self.start_times.get(&kind).copied()
    }

    /// Moves focus to `name`, dropping everything tied to the old session.
    ///
    /// Ignored in pinned mode.
    pub fn focus_session(&mut self, name: &str) {
        if self.mode == Mode::Pinned || self.session.as_deref() == Some(name) {
            return;
        }
        info!(from = ?self.session, to = name, "Switching session");
        self.session = Some(name.to_string());
        self.strategy = None;
        self.start_times.clear();
    }

    /// Runs one resolve + render pass.
    ///
    /// `None` means the previous frame should stay on screen.
    pub fn refresh(&mut self, now_ms: i64) -> Option<Frame> {
        match self.mode {
            Mode::Pinned => self.refresh_pinned(now_ms),
            Mode::Auto => Some(self.refresh_auto(now_ms)),
        }
    }

    fn refresh_pinned(&mut self, now_ms: i64) -> Option<Frame> {
        let path = self.session_path()?;
        let strategy = self.strategy?;
        let kind = strategy.kind();

        match strategy.parse_state_at(&path, self.start_time(kind), now_ms) {
            Some(state) => {
                self.start_times.entry(kind).or_insert(state.start_time());
                Some(strategy.render(&state, now_ms))
            }
            None => {
                debug!(session = %path.display(), "Pinned session unreadable, keeping last frame");
                None
            }
        }
    }

    fn refresh_auto(&mut self, now_ms: i64) -> Frame {
        self.resolve_session();

        let Some(path) = self.session_path().filter(|path| path.is_dir()) else {
            self.start_times.clear();
            return views::generic_waiting();
        };

        if self.hint.is_none() && detect_active_workflows(&path).len() > 1 {
            return views::combined(&path, &self.registry, &mut self.start_times, now_ms);
        }

        let Some(strategy) = self.select_strategy(&path) else {
            return views::generic_waiting();
        };
        let kind = strategy.kind();
        match strategy.parse_state_at(&path, self.start_time(kind), now_ms) {
            Some(state) => {
                self.start_times.entry(kind).or_insert(state.start_time());
                strategy.render(&state, now_ms)
            }
            None => strategy.render_waiting(),
        }
    }

    /// Re-resolves focus when the focused session is gone or finished.
    ///
    /// A finished session keeps focus while nothing newer is active, so its
    /// final frame stays up.
    fn resolve_session(&mut self) {
        let focused = self.session_path();
        if focused
            .as_deref()
            .is_some_and(|path| path.is_dir() && is_session_active(path))
        {
            return;
        }

        match find_latest_active_session(&self.sessions_dir) {
            Some(latest) => self.focus_session(&latest),
            None => {
                if focused.is_some_and(|path| !path.is_dir()) {
                    info!(session = ?self.session, "Focused session removed");
                    self.session = None;
                    self.strategy = None;
                    self.start_times.clear();
                }
            }
        }
    }

    /// The strategy for the session's current kind.
    ///
    /// The kind is re-detected each pass because a fresh session often has
    /// no artifacts yet and only later shows which workflow it runs.
    fn select_strategy(&mut self, path: &Path) -> Option<Strategy> {
        let kind = detect_workflow_type(path, self.hint)?;
        if self.strategy.map(|s| s.kind()) != Some(kind) {
            self.strategy = self.registry.get(kind).copied();
            if self.strategy.is_some() {
                debug!(session = %path.display(), %kind, "Selected strategy");
            }
        }
        self.strategy
    }
}
