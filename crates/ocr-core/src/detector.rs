//! Workflow kind detection for a session directory.
//!
//! Everything here reads the filesystem and nothing else. Missing files and
//! malformed status records never fail a call; they just fall through to the
//! next source of truth.

use std::path::Path;

use tracing::trace;

use crate::artifacts::{
    self, FINAL_FILE, MAP_DIR, MAP_FILE, ROUNDS_DIR, ROUND_PREFIX, RUNS_DIR, RUN_PREFIX,
};
use crate::model::{StateJson, WorkflowKind};

/// Phase keys that only the map workflow uses (besides the `map-` prefix).
const MAP_ONLY_PHASES: [&str; 3] = ["topology", "flow-analysis", "requirements-mapping"];

/// True if a status-file phase key belongs to the map workflow.
pub fn is_map_phase(phase: &str) -> bool {
    phase.starts_with("map-") || MAP_ONLY_PHASES.contains(&phase)
}

/// Decides which workflow a session is running.
///
/// Priority: explicit hint, then the status file's `workflow_type`, then the
/// artifact directories on disk. When both `rounds/` and `map/` exist, the
/// status file's current phase breaks the tie. With no evidence at all this
/// returns [`WorkflowKind::Review`], which corrects itself once artifacts
/// appear.
pub fn detect_workflow_type(
    session_path: &Path,
    explicit_hint: Option<WorkflowKind>,
) -> Option<WorkflowKind> {
    if let Some(kind) = explicit_hint {
        return Some(kind);
    }

    let state = StateJson::try_load(session_path);
    if let Some(kind) = state.as_ref().and_then(StateJson::workflow_kind) {
        trace!(session = %session_path.display(), %kind, "Kind from status file");
        return Some(kind);
    }

    let has_rounds = session_path.join(ROUNDS_DIR).exists();
    let has_map = session_path.join(MAP_DIR).exists();

    let kind = match (has_rounds, has_map) {
        (true, false) => WorkflowKind::Review,
        (false, true) => WorkflowKind::Map,
        (true, true) => match state {
            Some(state) if is_map_phase(&state.current_phase) => WorkflowKind::Map,
            _ => WorkflowKind::Review,
        },
        (false, false) => WorkflowKind::Review,
    };
    trace!(session = %session_path.display(), %kind, "Kind from artifacts");
    Some(kind)
}

/// A session is active unless its status file says it is closed or complete.
///
/// A missing or unreadable status file counts as active.
pub fn is_session_active(session_path: &Path) -> bool {
    match StateJson::try_load(session_path) {
        Some(state) => !(state.is_closed() || state.is_complete()),
        None => true,
    }
}

/// Workflows in a session that have started and not yet finished.
///
/// Ordered review first, then map. A kind is active when its artifact
/// directory exists and its latest round/run has no final output yet. With
/// no artifacts at all, the status file's kind hint is used unless it reports
/// completion.
pub fn detect_active_workflows(session_path: &Path) -> Vec<WorkflowKind> {
    let mut active = Vec::new();

    let rounds_dir = session_path.join(ROUNDS_DIR);
    if rounds_dir.exists() && latest_unit_open(&rounds_dir, ROUND_PREFIX, FINAL_FILE) {
        active.push(WorkflowKind::Review);
    }

    let map_dir = session_path.join(MAP_DIR);
    if map_dir.exists() && latest_unit_open(&map_dir.join(RUNS_DIR), RUN_PREFIX, MAP_FILE) {
        active.push(WorkflowKind::Map);
    }

    if active.is_empty() {
        if let Some(state) = StateJson::try_load(session_path) {
            if let Some(kind) = state.workflow_kind() {
                if !state.is_complete() {
                    active.push(kind);
                }
            }
        }
    }

    active
}

/// True when both review and map are in progress in the same session.
pub fn has_both_workflows_active(session_path: &Path) -> bool {
    let active = detect_active_workflows(session_path);
    WorkflowKind::ALL.iter().all(|kind| active.contains(kind))
}

/// The highest-numbered unit lacks its final output, or no unit exists yet.
fn latest_unit_open(parent: &Path, prefix: &str, final_file: &str) -> bool {
    match artifacts::numbered_dirs(parent, prefix).last() {
        Some((_, latest)) => !latest.join(final_file).exists(),
        None => true,
    }
}
