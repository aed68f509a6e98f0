//! Workflow state model.
//!
//! Two kinds of data live here:
//!
//! - [`StateJson`]: the status record the orchestrating agent writes to
//!   `<session>/state.json`. Read-only from our side and treated as a hint.
//! - [`WorkflowState`]: progress derived from the session directory on every
//!   pass. Never persisted, never cached across renders.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ParseKindError, StateFileError, StateFileResult};

/// Name of the status file inside every session directory.
pub const STATE_FILE: &str = "state.json";

/// Phase key that marks a finished workflow, shared by every kind.
pub const COMPLETE_PHASE: &str = "complete";

// ============================================================================
// Workflow Kind
// ============================================================================

/// High-level workflow a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    /// Multi-reviewer code review, iterated in rounds.
    Review,
    /// Code review map, iterated in runs.
    Map,
}

impl WorkflowKind {
    /// Every known kind, in display order.
    pub const ALL: [WorkflowKind; 2] = [WorkflowKind::Review, WorkflowKind::Map];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Map => "map",
        }
    }

    /// Label used in the combined view.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Review => "Review",
            Self::Map => "Map",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "review" => Ok(Self::Review),
            "map" => Ok(Self::Map),
            other => Err(ParseKindError {
                value: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Phases
// ============================================================================

/// One entry of a workflow's fixed phase table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseInfo {
    pub key: &'static str,
    pub label: &'static str,
}

impl PhaseInfo {
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

/// Progress of a phase or of a sub-agent within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
}

impl PhaseStatus {
    pub fn from_flags(is_complete: bool, is_current: bool) -> Self {
        if is_complete {
            Self::Complete
        } else if is_current {
            Self::InProgress
        } else {
            Self::Pending
        }
    }
}

// ============================================================================
// Status File
// ============================================================================

/// Coarse lifecycle reported by the orchestrating agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Closed,
    /// Any value this version does not recognize.
    #[serde(other)]
    Unknown,
}

/// Raw `state.json` written by the orchestrating agent.
///
/// Every field is optional or defaulted: the agent writes this file
/// incrementally and we must tolerate partial records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateJson {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    /// Kind hint. Kept as a string so an unrecognized value does not make
    /// the whole record unreadable.
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(default)]
    pub current_phase: String,
    #[serde(default)]
    pub phase_number: u32,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,

    // Review
    #[serde(default)]
    pub current_round: Option<u32>,
    #[serde(default)]
    pub round_started_at: Option<String>,

    // Map
    #[serde(default)]
    pub current_map_run: Option<u32>,
    #[serde(default)]
    pub map_started_at: Option<String>,
}

impl StateJson {
    /// Loads `<session>/state.json`.
    pub fn load(session_path: &Path) -> StateFileResult<Self> {
        let path = session_path.join(STATE_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StateFileError::Missing { path });
            }
            Err(source) => return Err(StateFileError::Io { path, source }),
        };
        serde_json::from_str(&content).map_err(|source| StateFileError::Parse { path, source })
    }

    /// Loads the status file, logging and swallowing any failure.
    pub fn try_load(session_path: &Path) -> Option<Self> {
        match Self::load(session_path) {
            Ok(state) => Some(state),
            Err(StateFileError::Missing { .. }) => None,
            Err(e) => {
                debug!(error = %e, "Ignoring unreadable status file");
                None
            }
        }
    }

    /// The recognized workflow kind hint, if any.
    pub fn workflow_kind(&self) -> Option<WorkflowKind> {
        self.workflow_type.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn is_closed(&self) -> bool {
        self.status == Some(SessionStatus::Closed)
    }

    pub fn is_complete(&self) -> bool {
        self.current_phase == COMPLETE_PHASE
    }
}

/// Parses a status-file timestamp into milliseconds since the epoch.
///
/// Accepts RFC 3339, plus naive date-times and bare dates interpreted as UTC.
pub fn parse_timestamp_ms(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

// ============================================================================
// Derived State
// ============================================================================

/// Fields every workflow variant carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseProgress {
    /// Session directory basename.
    pub session: String,
    /// Current phase key as reported by the status file.
    pub phase: String,
    pub phase_number: u32,
    pub total_phases: u32,
    /// Wall-clock start, milliseconds since the epoch.
    pub start_time: i64,
    pub complete: bool,
}

/// Derived progress of one workflow in one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Review(ReviewState),
    Map(MapState),
}

impl WorkflowState {
    pub fn kind(&self) -> WorkflowKind {
        match self {
            Self::Review(_) => WorkflowKind::Review,
            Self::Map(_) => WorkflowKind::Map,
        }
    }

    pub fn progress(&self) -> &PhaseProgress {
        match self {
            Self::Review(state) => &state.progress,
            Self::Map(state) => &state.progress,
        }
    }

    pub fn start_time(&self) -> i64 {
        self.progress().start_time
    }
}

/// A review round found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundInfo {
    pub round: u32,
    /// `final.md` exists in the round directory.
    pub is_complete: bool,
    /// Reviewer file stems present in `reviews/`.
    pub reviewers: Vec<String>,
}

/// One reviewer's output in the current round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerStatus {
    pub name: String,
    pub display_name: String,
    pub status: PhaseStatus,
    pub findings: usize,
}

/// Derived state of the 8-phase review workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewState {
    pub progress: PhaseProgress,
    pub context_complete: bool,
    pub change_context_complete: bool,
    pub analysis_complete: bool,
    pub reviews_complete: bool,
    pub aggregation_complete: bool,
    pub discourse_complete: bool,
    pub synthesis_complete: bool,
    pub current_round: u32,
    pub rounds: Vec<RoundInfo>,
    pub reviewers: Vec<ReviewerStatus>,
}

impl ReviewState {
    /// Total findings across the current round's reviewers.
    pub fn total_findings(&self) -> usize {
        self.reviewers.iter().map(|r| r.findings).sum()
    }
}

/// A map run found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRunInfo {
    pub run: u32,
    /// `map.md` exists in the run directory.
    pub is_complete: bool,
    /// Entries in the topology's canonical file list, 0 if unknown.
    pub file_count: usize,
}

/// An analyst agent contributing to a map phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStatus {
    pub name: String,
    pub display_name: String,
    pub status: PhaseStatus,
}

/// Derived state of the 6-phase map workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapState {
    pub progress: PhaseProgress,
    pub context_complete: bool,
    pub topology_complete: bool,
    pub flow_analysis_complete: bool,
    pub requirements_mapping_complete: bool,
    pub synthesis_complete: bool,
    pub current_run: u32,
    pub runs: Vec<MapRunInfo>,
    pub flow_analysts: Vec<AgentStatus>,
    pub requirements_mappers: Vec<AgentStatus>,
    pub has_requirements: bool,
}

impl MapState {
    /// The summary of the run currently being tracked.
    pub fn current_run_info(&self) -> Option<&MapRunInfo> {
        self.runs.iter().find(|r| r.run == self.current_run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_workflow_kind_round_trip_str() {
        assert_eq!("review".parse::<WorkflowKind>(), Ok(WorkflowKind::Review));
        assert_eq!("map".parse::<WorkflowKind>(), Ok(WorkflowKind::Map));
        assert!("Review".parse::<WorkflowKind>().is_err());
        assert_eq!(WorkflowKind::Map.to_string(), "map");
    }

    #[test]
    fn test_state_json_tolerates_partial_record() {
        let state: StateJson = serde_json::from_str(r#"{"current_phase":"reviews"}"#).unwrap();
        assert_eq!(state.current_phase, "reviews");
        assert_eq!(state.phase_number, 0);
        assert!(state.status.is_none());
        assert!(state.workflow_kind().is_none());
    }

    #[test]
    fn test_state_json_unknown_values_do_not_fail() {
        let state: StateJson = serde_json::from_str(
            r#"{"session_id":"x","status":"paused","workflow_type":"deploy","current_phase":"a","phase_number":2,"extra":true}"#,
        )
        .unwrap();
        assert_eq!(state.status, Some(SessionStatus::Unknown));
        assert!(state.workflow_kind().is_none());
        assert!(!state.is_closed());
    }

    #[test]
    fn test_load_reports_missing_and_parse_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            StateJson::load(dir.path()),
            Err(StateFileError::Missing { .. })
        ));

        fs::write(dir.path().join(STATE_FILE), "{ nope").unwrap();
        assert!(matches!(
            StateJson::load(dir.path()),
            Err(StateFileError::Parse { .. })
        ));
        assert!(StateJson::try_load(dir.path()).is_none());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp_ms("1970-01-01T00:00:01Z"), Some(1000));
        assert_eq!(parse_timestamp_ms("1970-01-01T00:00:01.500+00:00"), Some(1500));
        assert_eq!(parse_timestamp_ms("1970-01-01T00:01:00"), Some(60_000));
        assert_eq!(parse_timestamp_ms("1970-01-02"), Some(86_400_000));
        assert_eq!(parse_timestamp_ms("yesterday"), None);
    }

    #[test]
    fn test_phase_status_from_flags() {
        assert_eq!(PhaseStatus::from_flags(true, true), PhaseStatus::Complete);
        assert_eq!(PhaseStatus::from_flags(false, true), PhaseStatus::InProgress);
        assert_eq!(PhaseStatus::from_flags(false, false), PhaseStatus::Pending);
    }
}
