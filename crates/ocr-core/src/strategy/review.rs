//! The 8-phase multi-reviewer code review workflow.

use std::path::Path;

use crossterm::style::Stylize;
use tracing::debug;

use super::{clamp_unit, phase_label, resolve_start_time, session_name};
use crate::artifacts::{
    self, CONTEXT_FILE, DISCOURSE_FILE, DISCOVERED_STANDARDS_FILE, FINAL_FILE, REVIEWS_DIR,
    ROUNDS_DIR, ROUND_PREFIX,
};
use crate::model::{
    PhaseInfo, PhaseProgress, PhaseStatus, ReviewState, ReviewerStatus, RoundInfo, StateJson,
    COMPLETE_PHASE,
};
use crate::render::{self, Frame, FrameKind};

pub const REVIEW_PHASES: [PhaseInfo; 8] = [
    PhaseInfo::new("context", "Context Discovery"),
    PhaseInfo::new("change-context", "Change Context"),
    PhaseInfo::new("analysis", "Tech Lead Analysis"),
    PhaseInfo::new("reviews", "Parallel Reviews"),
    PhaseInfo::new("aggregation", "Aggregate Findings"),
    PhaseInfo::new("discourse", "Reviewer Discourse"),
    PhaseInfo::new("synthesis", "Final Synthesis"),
    PhaseInfo::new(COMPLETE_PHASE, "Complete"),
];

/// Phase number after which parallel reviews are considered done.
const REVIEWS_PHASE_NUMBER: u32 = 4;

/// Progress strategy for review sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewStrategy;

impl ReviewStrategy {
    /// Derives review progress from `session_path`.
    ///
    /// Any status file is accepted: sessions created before `workflow_type`
    /// existed are review sessions.
    pub fn parse_state_at(
        &self,
        session_path: &Path,
        preserved_start_time: Option<i64>,
        now_ms: i64,
    ) -> Option<ReviewState> {
        let state = StateJson::try_load(session_path)?;

        let start_time = resolve_start_time(
            preserved_start_time,
            &[state.round_started_at.as_deref(), state.started_at.as_deref()],
            now_ms,
        );

        let rounds = derive_rounds(&session_path.join(ROUNDS_DIR));
        let current_round = clamp_unit(state.current_round, rounds.last().map(|r| r.round));
        let round_path = artifacts::round_dir(session_path, current_round);
        let reviewers = derive_reviewers(&round_path.join(REVIEWS_DIR));

        let context_complete = session_path.join(DISCOVERED_STANDARDS_FILE).exists();
        let change_context_complete = session_path.join(CONTEXT_FILE).exists();
        let discourse_complete = round_path.join(DISCOURSE_FILE).exists();
        let synthesis_complete = round_path.join(FINAL_FILE).exists();
        let reviews_complete = state.phase_number > REVIEWS_PHASE_NUMBER
            || discourse_complete
            || synthesis_complete;

        debug!(
            session = %session_path.display(),
            phase = %state.current_phase,
            round = current_round,
            reviewers = reviewers.len(),
            "Parsed review state"
        );

        Some(ReviewState {
            progress: PhaseProgress {
                session: session_name(session_path),
                complete: state.is_complete(),
                phase: state.current_phase,
                phase_number: state.phase_number,
                total_phases: REVIEW_PHASES.len() as u32,
                start_time,
            },
            context_complete,
            change_context_complete,
            analysis_complete: change_context_complete,
            reviews_complete,
            aggregation_complete: reviews_complete,
            discourse_complete,
            synthesis_complete,
            current_round,
            rounds,
            reviewers,
        })
    }

    pub fn render(&self, state: &ReviewState, now_ms: i64) -> Frame {
        let progress = &state.progress;
        let mut frame = Frame::new(FrameKind::ReviewProgress);

        frame.blank();
        frame.line(render::title_line(None));
        frame.blank();

        let round_info = if state.current_round > 1 {
            format!(
                "{}{}",
                format!(" Round {}", state.current_round).cyan(),
                "  ·  ".dim()
            )
        } else {
            String::new()
        };
        frame.line(format!(
            "  {}{}{}{}",
            progress.session.as_str().white(),
            "  ·  ".dim(),
            round_info,
            render::format_duration(now_ms - progress.start_time).white()
        ));
        frame.blank();

        let total = progress.total_phases;
        let current = if progress.complete {
            total
        } else {
            progress.phase_number
        };
        let label = if progress.complete {
            Some("Done")
        } else {
            phase_label(&REVIEW_PHASES, &progress.phase)
        };
        frame.line(format!("  {}", render::progress_bar(current, total, label)));
        frame.blank();

        for phase in &REVIEW_PHASES {
            let is_complete = phase_complete(state, phase.key);
            let is_current = progress.phase == phase.key && !progress.complete;
            frame.line(format!(
                "  {} {}",
                render::phase_glyph(is_complete, is_current),
                render::phase_label(phase.label, is_complete, is_current)
            ));

            if phase.key == "reviews" && !state.reviewers.is_empty() {
                render_reviewers(&mut frame, state);
            }
        }
        frame.blank();

        if progress.complete {
            let findings = render::plural(state.total_findings(), "finding");
            frame.line(format!(
                "{}{}{}",
                "  ✓ Complete".green().bold(),
                " · ".dim(),
                findings.white()
            ));
            frame.line(format!(
                "    {}{}",
                "→ ".dim(),
                format!(
                    ".ocr/sessions/{}/{ROUNDS_DIR}/{ROUND_PREFIX}-{}/{FINAL_FILE}",
                    progress.session, state.current_round
                )
                .white()
            ));
        } else {
            frame.line(render::exit_hint());
        }
        frame.blank();

        frame
    }

    pub fn render_waiting(&self) -> Frame {
        render::waiting_frame(FrameKind::ReviewWaiting, None, &["/ocr-review"])
    }
}

fn phase_complete(state: &ReviewState, key: &str) -> bool {
    match key {
        "context" => state.context_complete,
        "change-context" => state.change_context_complete,
        "analysis" => state.analysis_complete,
        "reviews" => state.reviews_complete,
        "aggregation" => state.aggregation_complete,
        "discourse" => state.discourse_complete,
        "synthesis" => state.synthesis_complete,
        COMPLETE_PHASE => state.progress.complete,
        _ => false,
    }
}

fn render_reviewers(frame: &mut Frame, state: &ReviewState) {
    if state.current_round > 1 {
        frame.line(format!(
            "    {}",
            format!("Round {}", state.current_round).cyan()
        ));
    }

    let entries: Vec<String> = state
        .reviewers
        .iter()
        .map(|reviewer| {
            let count = if reviewer.findings > 0 {
                format!(" {}", reviewer.findings).cyan().to_string()
            } else {
                " 0".dim().to_string()
            };
            format!(
                "{} {}{}",
                render::agent_icon(reviewer.status),
                reviewer.display_name.as_str().dim(),
                count
            )
        })
        .collect();
    frame.line(format!("    {}", entries.join(&render::agent_separator())));

    if let Some((_, previous)) = state.rounds.split_last() {
        for round in previous {
            let status = if round.is_complete {
                "✓".green().to_string()
            } else {
                "○".dim().to_string()
            };
            frame.line(format!(
                "{} {} {}",
                format!("    Round {}", round.round).dim(),
                status,
                render::plural(round.reviewers.len(), "reviewer").dim()
            ));
        }
    }
}

/// Every `round-<n>` directory, ascending.
fn derive_rounds(rounds_dir: &Path) -> Vec<RoundInfo> {
    artifacts::numbered_dirs(rounds_dir, ROUND_PREFIX)
        .into_iter()
        .map(|(round, path)| RoundInfo {
            round,
            is_complete: path.join(FINAL_FILE).exists(),
            reviewers: artifacts::markdown_files(&path.join(REVIEWS_DIR))
                .iter()
                .map(|file| artifacts::file_stem(file).to_string())
                .collect(),
        })
        .collect()
}

/// One entry per review file; a file on disk means that reviewer finished.
fn derive_reviewers(reviews_dir: &Path) -> Vec<ReviewerStatus> {
    artifacts::markdown_files(reviews_dir)
        .into_iter()
        .map(|file| ReviewerStatus {
            name: artifacts::file_stem(&file).to_string(),
            display_name: artifacts::format_agent_name(&file),
            status: PhaseStatus::Complete,
            findings: artifacts::count_findings(&reviews_dir.join(&file)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn session(json: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("state.json"), json).unwrap();
        dir
    }

    #[test]
    fn test_no_status_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ReviewStrategy.parse_state_at(dir.path(), None, 0).is_none());
    }

    #[test]
    fn test_flags_from_artifacts() {
        let dir = session(r#"{"current_phase":"discourse","phase_number":6,"current_round":1}"#);
        let root = dir.path();
        fs::write(root.join("discovered-standards.md"), "").unwrap();
        fs::write(root.join("context.md"), "").unwrap();
        fs::create_dir_all(root.join("rounds/round-1/reviews")).unwrap();
        fs::write(root.join("rounds/round-1/discourse.md"), "").unwrap();

        let state = ReviewStrategy.parse_state_at(root, None, 0).unwrap();
        assert!(state.context_complete);
        assert!(state.change_context_complete);
        assert!(state.analysis_complete);
        assert!(state.reviews_complete);
        assert!(state.aggregation_complete);
        assert!(state.discourse_complete);
        assert!(!state.synthesis_complete);
        assert!(!state.progress.complete);
    }

    #[test]
    fn test_later_artifact_marks_reviews_done() {
        let dir = session(r#"{"current_phase":"synthesis","phase_number":3}"#);
        fs::create_dir_all(dir.path().join("rounds/round-1")).unwrap();
        fs::write(dir.path().join("rounds/round-1/final.md"), "").unwrap();

        let state = ReviewStrategy.parse_state_at(dir.path(), None, 0).unwrap();
        assert!(state.reviews_complete);
        assert!(state.synthesis_complete);
    }

    #[test]
    fn test_round_clamped_to_disk() {
        let dir = session(r#"{"current_phase":"reviews","phase_number":4,"current_round":5}"#);
        for n in 1..=3 {
            fs::create_dir_all(dir.path().join(format!("rounds/round-{n}/reviews"))).unwrap();
        }
        fs::write(dir.path().join("rounds/round-3/reviews/quality-1.md"), "## Issue\n").unwrap();

        let state = ReviewStrategy.parse_state_at(dir.path(), None, 0).unwrap();
        assert_eq!(state.current_round, 3);
        assert_eq!(state.rounds.len(), 3);
        assert_eq!(state.reviewers.len(), 1);
        assert_eq!(state.reviewers[0].display_name, "Quality #1");
        assert_eq!(state.reviewers[0].findings, 1);
    }

    #[test]
    fn test_start_time_sources() {
        let dir = session(
            r#"{"current_phase":"context","started_at":"1970-01-01T00:00:01Z","round_started_at":"1970-01-01T00:00:02Z"}"#,
        );
        let parsed = ReviewStrategy.parse_state_at(dir.path(), None, 99).unwrap();
        assert_eq!(parsed.progress.start_time, 2000);

        let preserved = ReviewStrategy.parse_state_at(dir.path(), Some(42), 99).unwrap();
        assert_eq!(preserved.progress.start_time, 42);

        let bad = session(r#"{"current_phase":"context","started_at":"soon"}"#);
        let parsed = ReviewStrategy.parse_state_at(bad.path(), None, 99).unwrap();
        assert_eq!(parsed.progress.start_time, 99);
    }

    #[test]
    fn test_render_in_progress() {
        let dir = session(r#"{"current_phase":"reviews","phase_number":4,"started_at":"1970-01-01T00:00:00Z"}"#);
        fs::create_dir_all(dir.path().join("rounds/round-1/reviews")).unwrap();
        fs::write(
            dir.path().join("rounds/round-1/reviews/security-1.md"),
            "## Finding: a\n## Finding: b\n",
        )
        .unwrap();
        fs::write(dir.path().join("rounds/round-1/reviews/principal-1.md"), "ok").unwrap();

        let state = ReviewStrategy.parse_state_at(dir.path(), None, 0).unwrap();
        let frame = ReviewStrategy.render(&state, 65_000);
        let lines = frame.plain_lines();

        assert_eq!(frame.kind, FrameKind::ReviewProgress);
        assert!(lines.iter().any(|l| l.ends_with("1m 5s")));
        assert!(lines.iter().any(|l| l.contains("50% · Parallel Reviews")));
        assert!(lines.iter().any(|l| l == "  ▸ Parallel Reviews"));
        assert!(lines
            .iter()
            .any(|l| l == "    ✓ Principal #1 0  │  ✓ Security #1 2"));
        assert!(lines.iter().any(|l| l == "  Ctrl+C to exit"));
    }

    #[test]
    fn test_render_complete_with_previous_rounds() {
        let dir = session(r#"{"current_phase":"complete","phase_number":8,"current_round":2}"#);
        fs::create_dir_all(dir.path().join("rounds/round-1/reviews")).unwrap();
        fs::write(dir.path().join("rounds/round-1/reviews/a-1.md"), "").unwrap();
        fs::write(dir.path().join("rounds/round-1/final.md"), "").unwrap();
        fs::create_dir_all(dir.path().join("rounds/round-2/reviews")).unwrap();
        fs::write(dir.path().join("rounds/round-2/reviews/a-1.md"), "## Finding\n").unwrap();

        let state = ReviewStrategy.parse_state_at(dir.path(), None, 0).unwrap();
        let text = ReviewStrategy.render(&state, 0).plain_text();
        let name = session_name(dir.path());

        assert!(text.contains("100% · Done"));
        assert!(text.contains(" Round 2  ·  "));
        assert!(text.contains("    Round 1 ✓ 1 reviewer"));
        assert!(text.contains("  ✓ Complete · 1 finding"));
        assert!(text.contains(&format!(".ocr/sessions/{name}/rounds/round-2/final.md")));
        assert!(!text.contains("Ctrl+C to exit"));
    }

    #[test]
    fn test_render_waiting() {
        let frame = ReviewStrategy.render_waiting();
        assert_eq!(frame.kind, FrameKind::ReviewWaiting);
        assert!(frame.plain_text().contains("Run /ocr-review to start"));
    }
}
