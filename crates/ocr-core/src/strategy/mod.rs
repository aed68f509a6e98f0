//! Per-workflow progress strategies.
//!
//! A strategy owns a workflow's phase table and knows how to turn a session
//! directory into a [`WorkflowState`] and that state into a [`Frame`]. The
//! set of workflows is closed, so dispatch is a plain `match` over
//! [`Strategy`].

pub mod map;
pub mod review;

use std::path::Path;

use chrono::Utc;

pub use map::{MapStrategy, MAP_PHASES};
pub use review::{ReviewStrategy, REVIEW_PHASES};

use crate::model::{parse_timestamp_ms, PhaseInfo, WorkflowKind, WorkflowState};
use crate::render::Frame;

/// Progress tracking for one workflow kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Review(ReviewStrategy),
    Map(MapStrategy),
}

impl Strategy {
    /// The strategy for `kind`.
    pub fn for_kind(kind: WorkflowKind) -> Self {
        match kind {
            WorkflowKind::Review => Self::Review(ReviewStrategy),
            WorkflowKind::Map => Self::Map(MapStrategy),
        }
    }

    pub fn kind(&self) -> WorkflowKind {
        match self {
            Self::Review(_) => WorkflowKind::Review,
            Self::Map(_) => WorkflowKind::Map,
        }
    }

    /// Ordered phase table.
    pub fn phases(&self) -> &'static [PhaseInfo] {
        match self {
            Self::Review(_) => &REVIEW_PHASES,
            Self::Map(_) => &MAP_PHASES,
        }
    }

    pub fn total_phases(&self) -> u32 {
        self.phases().len() as u32
    }

    /// Display label of a phase key, if the key is in the table.
    pub fn phase_label(&self, key: &str) -> Option<&'static str> {
        phase_label(self.phases(), key)
    }

    /// Derives the session's progress, or `None` if it has no usable status
    /// file for this workflow.
    pub fn parse_state(
        &self,
        session_path: &Path,
        preserved_start_time: Option<i64>,
    ) -> Option<WorkflowState> {
        self.parse_state_at(session_path, preserved_start_time, now_ms())
    }

    /// [`Strategy::parse_state`] with an explicit "now" for the start-time
    /// fallback.
    pub fn parse_state_at(
        &self,
        session_path: &Path,
        preserved_start_time: Option<i64>,
        now_ms: i64,
    ) -> Option<WorkflowState> {
        match self {
            Self::Review(s) => s
                .parse_state_at(session_path, preserved_start_time, now_ms)
                .map(WorkflowState::Review),
            Self::Map(s) => s
                .parse_state_at(session_path, preserved_start_time, now_ms)
                .map(WorkflowState::Map),
        }
    }

    /// Renders a state produced by this strategy.
    ///
    /// A state of another kind renders this strategy's waiting frame.
    pub fn render(&self, state: &WorkflowState, now_ms: i64) -> Frame {
        match (self, state) {
            (Self::Review(s), WorkflowState::Review(state)) => s.render(state, now_ms),
            (Self::Map(s), WorkflowState::Map(state)) => s.render(state, now_ms),
            _ => self.render_waiting(),
        }
    }

    /// Placeholder frame for a session without state.
    pub fn render_waiting(&self) -> Frame {
        match self {
            Self::Review(s) => s.render_waiting(),
            Self::Map(s) => s.render_waiting(),
        }
    }
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn phase_label(phases: &[PhaseInfo], key: &str) -> Option<&'static str> {
    phases.iter().find(|p| p.key == key).map(|p| p.label)
}

/// Picks the start time: preserved value, then the first timestamp that
/// parses, then `now_ms`.
pub(crate) fn resolve_start_time(
    preserved: Option<i64>,
    candidates: &[Option<&str>],
    now_ms: i64,
) -> i64 {
    preserved
        .or_else(|| {
            candidates
                .iter()
                .flatten()
                .find_map(|value| parse_timestamp_ms(value))
        })
        .unwrap_or(now_ms)
}

/// `min(reported or 1, highest on disk or 1)`, never below 1.
pub(crate) fn clamp_unit(reported: Option<u32>, highest_on_disk: Option<u32>) -> u32 {
    reported
        .unwrap_or(1)
        .min(highest_on_disk.unwrap_or(1))
        .max(1)
}

pub(crate) fn session_name(session_path: &Path) -> String {
    session_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
