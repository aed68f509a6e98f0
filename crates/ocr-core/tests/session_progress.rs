//! Integration tests for reconstructing progress from a session directory.
//!
//! These drive the public API the way the progress viewer does: locate a
//! session, detect its workflow, look up the strategy, parse and render.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

use std::fs;
use std::path::{Path, PathBuf};

use ocr_core::{
    detect_workflow_type, find_latest_active_session, FrameKind, StrategyRegistry, WorkflowKind,
    WorkflowState,
};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

/// Creates `<tmp>/.ocr/sessions` and returns (guard, sessions dir).
fn sessions_root() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let sessions = dir.path().join(".ocr").join("sessions");
    fs::create_dir_all(&sessions).expect("sessions dir");
    (dir, sessions)
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir");
    }
    fs::write(path, content).expect("write artifact");
}

/// Locates, detects, parses and renders in one go.
fn pass(sessions: &Path, hint: Option<WorkflowKind>) -> (FrameKind, Vec<String>) {
    let registry = StrategyRegistry::with_defaults();
    let Some(name) = find_latest_active_session(sessions) else {
        return (FrameKind::GenericWaiting, Vec::new());
    };
    let session = sessions.join(name);
    let kind = detect_workflow_type(&session, hint).expect("kind");
    let strategy = registry.get(kind).expect("strategy");
    let frame = match strategy.parse_state(&session, None) {
        Some(state) => strategy.render(&state, state.start_time()),
        None => strategy.render_waiting(),
    };
    (frame.kind, frame.plain_lines())
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

#[test]
fn test_empty_root_has_no_session() {
    let (_guard, sessions) = sessions_root();
    let (kind, _) = pass(&sessions, None);
    assert_eq!(kind, FrameKind::GenericWaiting);
}

#[test]
fn test_session_without_state_renders_waiting() {
    let (_guard, sessions) = sessions_root();
    fs::create_dir(sessions.join("2025-01-01-main")).unwrap();

    let (kind, lines) = pass(&sessions, None);
    assert_eq!(kind, FrameKind::ReviewWaiting);
    assert!(lines.iter().any(|l| l == "  Waiting for session..."));

    let (kind, _) = pass(&sessions, Some(WorkflowKind::Map));
    assert_eq!(kind, FrameKind::MapWaiting);
}

#[test]
fn test_first_phase_of_each_workflow() {
    let (_guard, sessions) = sessions_root();
    let session = sessions.join("2025-01-01-main");
    write(
        &session.join("state.json"),
        r#"{"session_id":"2025-01-01-main","current_phase":"context","phase_number":1}"#,
    );

    let (kind, lines) = pass(&sessions, None);
    assert_eq!(kind, FrameKind::ReviewProgress);
    assert!(lines.iter().any(|l| l.contains("13% · Context Discovery")));
    assert!(lines.iter().any(|l| l == "  ▸ Context Discovery"));
    assert!(!lines.iter().any(|l| l.starts_with("  ✓")));

    let (kind, lines) = pass(&sessions, Some(WorkflowKind::Map));
    assert_eq!(kind, FrameKind::MapProgress);
    assert!(lines.iter().any(|l| l.contains("17%")));
    assert!(!lines.iter().any(|l| l.starts_with("  ✓")));
}

#[test]
fn test_reviewer_appears_with_finding_count() {
    let (_guard, sessions) = sessions_root();
    let session = sessions.join("2025-01-01-main");
    write(
        &session.join("state.json"),
        r#"{"current_phase":"reviews","phase_number":4}"#,
    );
    write(
        &session.join("rounds/round-1/reviews/security-1.md"),
        "# Security\n\n## Finding: unchecked input\n",
    );

    let (_, lines) = pass(&sessions, None);
    assert!(
        lines.iter().any(|l| l == "    ✓ Security #1 1"),
        "reviewer line missing in {lines:#?}"
    );
}

// ============================================================================
// Derivation Properties
// ============================================================================

#[test]
fn test_parse_is_deterministic() {
    let (_guard, sessions) = sessions_root();
    let session = sessions.join("s");
    write(
        &session.join("state.json"),
        r#"{"current_phase":"aggregation","phase_number":5,"started_at":"2025-01-01T10:00:00Z"}"#,
    );
    write(&session.join("discovered-standards.md"), "");
    write(&session.join("rounds/round-1/reviews/a-1.md"), "## Issue\n## Issue\n");
    write(&session.join("rounds/round-1/reviews/b-1.md"), "");

    let strategy = StrategyRegistry::with_defaults()
        .get(WorkflowKind::Review)
        .copied()
        .unwrap();
    let first = strategy.parse_state(&session, None).unwrap();
    let second = strategy.parse_state(&session, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_preserved_start_time_is_reused() {
    let (_guard, sessions) = sessions_root();
    let session = sessions.join("s");
    write(
        &session.join("state.json"),
        r#"{"workflow_type":"map","current_phase":"topology","map_started_at":"2025-01-01T10:00:00Z"}"#,
    );

    let registry = StrategyRegistry::with_defaults();
    for strategy in registry.all() {
        if let Some(state) = strategy.parse_state(&session, Some(1_234)) {
            assert_eq!(state.start_time(), 1_234);
        }
    }
}

#[test]
fn test_round_and_run_clamped_to_disk() {
    let (_guard, sessions) = sessions_root();
    let session = sessions.join("s");
    write(
        &session.join("state.json"),
        r#"{"current_phase":"synthesis","phase_number":5,"current_round":5,"current_map_run":5}"#,
    );
    for n in 1..=3 {
        fs::create_dir_all(session.join(format!("rounds/round-{n}"))).unwrap();
        fs::create_dir_all(session.join(format!("map/runs/run-{n}"))).unwrap();
    }

    let registry = StrategyRegistry::with_defaults();
    let review = registry.get(WorkflowKind::Review).unwrap();
    match review.parse_state(&session, None) {
        Some(WorkflowState::Review(state)) => assert_eq!(state.current_round, 3),
        other => panic!("expected review state, got {other:?}"),
    }

    let map = registry.get(WorkflowKind::Map).unwrap();
    match map.parse_state(&session, None) {
        Some(WorkflowState::Map(state)) => assert_eq!(state.current_run, 3),
        other => panic!("expected map state, got {other:?}"),
    }
}
