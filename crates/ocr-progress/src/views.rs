//! Views that belong to no single workflow.

use std::collections::BTreeMap;
use std::path::Path;

use crossterm::style::{Color, Stylize};
use ocr_core::render::{self, Frame, FrameKind};
use ocr_core::{StrategyRegistry, WorkflowKind};

/// Shown while no session exists or its workflow is still unknown.
pub fn generic_waiting() -> Frame {
    render::waiting_frame(FrameKind::GenericWaiting, None, &["/ocr-review", "/ocr-map"])
}

fn kind_color(kind: WorkflowKind) -> Color {
    match kind {
        WorkflowKind::Review => Color::Blue,
        WorkflowKind::Map => Color::Green,
    }
}

/// One compact line per registered workflow, for sessions running several
/// at once.
///
/// Start times established here are recorded in `start_times`.
pub fn combined(
    session_path: &Path,
    registry: &StrategyRegistry,
    start_times: &mut BTreeMap<WorkflowKind, i64>,
    now_ms: i64,
) -> Frame {
    let session = session_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut frame = Frame::new(FrameKind::Combined);
    frame.blank();
    frame.line(format!(
        "{}{}",
        render::title_line(None),
        " · Parallel Workflows".yellow()
    ));
    frame.blank();
    frame.line(format!("  {}", session.as_str().white()));
    frame.blank();

    for strategy in registry.all() {
        let kind = strategy.kind();
        let color = kind_color(kind);
        // Labels padded so the bars line up.
        let label = format!("  ◉ {:<8}", kind.label()).with(color);

        let preserved = start_times.get(&kind).copied();
        match strategy.parse_state_at(session_path, preserved, now_ms) {
            Some(state) => {
                start_times.entry(kind).or_insert(state.start_time());
                let progress = state.progress();
                let percent = render::percent(progress.phase_number, strategy.total_phases());
                let (filled, empty) = render::compact_bar(percent);
                let phase = strategy
                    .phase_label(&progress.phase)
                    .unwrap_or(progress.phase.as_str());
                frame.line(format!(
                    "{label}{}{}  {} {} {}",
                    filled.with(color),
                    empty.dim(),
                    format!("{percent}%").white(),
                    "·".dim(),
                    phase.cyan()
                ));
            }
            None => {
                frame.line(format!(
                    "{label}{}",
                    format!("{}  0%", render::empty_compact_bar()).dim()
                ));
            }
        }
    }

    frame.blank();
    frame.line(format!(
        "{}{}{}{}{}",
        "  Use ".dim(),
        "--workflow review".white(),
        " or ".dim(),
        "--workflow map".white(),
        " for details".dim()
    ));
    frame.blank();
    frame.line(render::exit_hint());
    frame.blank();
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generic_waiting_mentions_both_commands() {
        let frame = generic_waiting();
        assert_eq!(frame.kind, FrameKind::GenericWaiting);
        assert!(frame
            .plain_text()
            .contains("Run /ocr-review or /ocr-map to start"));
    }

    #[test]
    fn test_combined_lines_per_workflow() {
        let dir = TempDir::new().unwrap();
        let session = dir.path().join("2025-01-01-main");
        fs::create_dir_all(&session).unwrap();
        fs::write(
            session.join("state.json"),
            r#"{"current_phase":"synthesis","phase_number":5,"started_at":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let registry = StrategyRegistry::with_defaults();
        let mut start_times = BTreeMap::new();
        let frame = combined(&session, &registry, &mut start_times, 0);
        let lines = frame.plain_lines();

        assert_eq!(frame.kind, FrameKind::Combined);
        assert!(lines
            .iter()
            .any(|l| l == "  Open Code Review · Parallel Workflows"));
        assert!(lines.iter().any(|l| l == "  2025-01-01-main"));
        assert!(lines
            .iter()
            .any(|l| l == "  ◉ Review  ━━━━━━────  63% · Final Synthesis"));
        assert!(lines
            .iter()
            .any(|l| l == "  ◉ Map     ━━━━━━━━──  83% · Map Synthesis"));
        assert_eq!(start_times.len(), 2);
    }

    #[test]
    fn test_combined_review_phase_is_not_map_progress() {
        let dir = TempDir::new().unwrap();
        let session = dir.path().join("s");
        fs::create_dir_all(session.join("rounds/round-1")).unwrap();
        fs::create_dir_all(session.join("map/runs/run-1")).unwrap();
        fs::write(
            session.join("state.json"),
            r#"{"current_phase":"aggregation","phase_number":5}"#,
        )
        .unwrap();

        let registry = StrategyRegistry::with_defaults();
        let mut start_times = BTreeMap::new();
        let lines = combined(&session, &registry, &mut start_times, 0).plain_lines();

        assert!(lines
            .iter()
            .any(|l| l == "  ◉ Review  ━━━━━━────  63% · Aggregate Findings"));
        assert!(lines.iter().any(|l| l == "  ◉ Map     ──────────  0%"));
        assert!(!start_times.contains_key(&WorkflowKind::Map));
    }

    #[test]
    fn test_combined_unparsed_workflow_shows_empty_bar() {
        let dir = TempDir::new().unwrap();
        let session = dir.path().join("s");
        fs::create_dir_all(&session).unwrap();
        fs::write(
            session.join("state.json"),
            r#"{"workflow_type":"review","current_phase":"context","phase_number":1}"#,
        )
        .unwrap();

        let registry = StrategyRegistry::with_defaults();
        let mut start_times = BTreeMap::new();
        let lines = combined(&session, &registry, &mut start_times, 0).plain_lines();

        assert!(lines.iter().any(|l| l == "  ◉ Map     ──────────  0%"));
        assert!(!start_times.contains_key(&WorkflowKind::Map));
    }
}
