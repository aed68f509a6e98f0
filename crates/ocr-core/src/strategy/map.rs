//! The 6-phase code review map workflow.

use std::path::Path;

use crossterm::style::Stylize;
use tracing::debug;

use super::{clamp_unit, phase_label, resolve_start_time, session_name};
use crate::artifacts::{
    self, DISCOVERED_STANDARDS_FILE, FLOW_ANALYSIS_DIR, FLOW_ANALYSIS_FILE, MAP_DIR, MAP_FILE,
    REQUIREMENTS_FILE, REQUIREMENTS_MAPPING_DIR, REQUIREMENTS_MAPPING_FILE, RUNS_DIR, RUN_PREFIX,
    TOPOLOGY_FILE,
};
use crate::detector::is_map_phase;
use crate::model::{
    AgentStatus, MapRunInfo, MapState, PhaseInfo, PhaseProgress, PhaseStatus, StateJson,
    WorkflowKind, COMPLETE_PHASE,
};
use crate::render::{self, Frame, FrameKind};

pub const MAP_PHASES: [PhaseInfo; 6] = [
    PhaseInfo::new("map-context", "Context Discovery"),
    PhaseInfo::new("topology", "Topology Analysis"),
    PhaseInfo::new("flow-analysis", "Flow Tracing"),
    PhaseInfo::new("requirements-mapping", "Requirements Mapping"),
    PhaseInfo::new("synthesis", "Map Synthesis"),
    PhaseInfo::new(COMPLETE_PHASE, "Complete"),
];

/// Opening phase both workflows share before the map one is written.
const SHARED_OPENING_PHASE: &str = "context";

/// Typed files must say `map`. Untyped ones must be at a phase the map
/// workflow can be in, so a review's progress is never read as a map's.
fn describes_map(state: &StateJson) -> bool {
    match state.workflow_kind() {
        Some(kind) => kind == WorkflowKind::Map,
        None => {
            let phase = state.current_phase.as_str();
            phase.is_empty()
                || phase == SHARED_OPENING_PHASE
                || is_map_phase(phase)
                || phase_label(&MAP_PHASES, phase).is_some()
        }
    }
}

/// Progress strategy for map sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStrategy;

impl MapStrategy {
    /// Derives map progress from `session_path`.
    ///
    /// Returns `None` when the status file belongs to another workflow,
    /// either by its `workflow_type` or, when untyped, by its phase.
    pub fn parse_state_at(
        &self,
        session_path: &Path,
        preserved_start_time: Option<i64>,
        now_ms: i64,
    ) -> Option<MapState> {
        let state = StateJson::try_load(session_path)?;
        if !describes_map(&state) {
            debug!(
                session = %session_path.display(),
                kind = ?state.workflow_type,
                phase = %state.current_phase,
                "Status file is not a map"
            );
            return None;
        }

        // started_at may belong to a review that ran first in the same session
        let start_time = resolve_start_time(
            preserved_start_time,
            &[state.map_started_at.as_deref(), state.started_at.as_deref()],
            now_ms,
        );

        let runs = derive_runs(&session_path.join(MAP_DIR).join(RUNS_DIR));
        let current_run = clamp_unit(state.current_map_run, runs.last().map(|r| r.run));
        let run_path = artifacts::run_dir(session_path, current_run);

        let context_complete = session_path.join(DISCOVERED_STANDARDS_FILE).exists();
        let topology_complete = run_path.join(TOPOLOGY_FILE).exists();
        let flow_analysis_complete = run_path.join(FLOW_ANALYSIS_FILE).exists();
        let requirements_mapping_complete = run_path.join(REQUIREMENTS_MAPPING_FILE).exists();
        let synthesis_complete = run_path.join(MAP_FILE).exists();
        let has_requirements = session_path.join(REQUIREMENTS_FILE).exists();

        let flow_analysts = derive_agents(
            &run_path.join(FLOW_ANALYSIS_DIR),
            flow_analysis_complete.then_some(("flow-analyst", "Flow Analysts")),
        );
        let requirements_mappers = if has_requirements {
            derive_agents(
                &run_path.join(REQUIREMENTS_MAPPING_DIR),
                requirements_mapping_complete.then_some(("req-mapper", "Requirements Mappers")),
            )
        } else {
            Vec::new()
        };

        debug!(
            session = %session_path.display(),
            phase = %state.current_phase,
            run = current_run,
            "Parsed map state"
        );

        Some(MapState {
            progress: PhaseProgress {
                session: session_name(session_path),
                complete: state.is_complete(),
                phase: state.current_phase,
                phase_number: state.phase_number,
                total_phases: MAP_PHASES.len() as u32,
                start_time,
            },
            context_complete,
            topology_complete,
            flow_analysis_complete,
            requirements_mapping_complete,
            synthesis_complete,
            current_run,
            runs,
            flow_analysts,
            requirements_mappers,
            has_requirements,
        })
    }

    pub fn render(&self, state: &MapState, now_ms: i64) -> Frame {
        let progress = &state.progress;
        let mut frame = Frame::new(FrameKind::MapProgress);

        frame.blank();
        frame.line(render::title_line(Some(" · Map")));
        frame.blank();

        let run_info = if state.current_run > 1 {
            format!(
                "{}{}",
                format!(" Run {}", state.current_run).cyan(),
                "  ·  ".dim()
            )
        } else {
            String::new()
        };
        frame.line(format!(
            "  {}{}{}{}",
            progress.session.as_str().white(),
            "  ·  ".dim(),
            run_info,
            render::format_duration(now_ms - progress.start_time).white()
        ));
        frame.blank();

        if let Some(run) = state.current_run_info().filter(|r| r.file_count > 0) {
            frame.line(format!(
                "  {}{}",
                format!("{} files", run.file_count).white(),
                " in changeset".dim()
            ));
            frame.blank();
        }

        let total = progress.total_phases;
        let current = if progress.complete {
            total
        } else {
            progress.phase_number
        };
        let label = if progress.complete {
            Some("Done")
        } else {
            phase_label(&MAP_PHASES, &progress.phase)
        };
        frame.line(format!("  {}", render::progress_bar(current, total, label)));
        frame.blank();

        for phase in &MAP_PHASES {
            if phase.key == "requirements-mapping" && !state.has_requirements {
                continue;
            }

            let is_complete = phase_complete(state, phase.key);
            let is_current = progress.phase == phase.key && !progress.complete;
            frame.line(format!(
                "  {} {}",
                render::phase_glyph(is_complete, is_current),
                render::phase_label(phase.label, is_complete, is_current)
            ));

            let agents: &[AgentStatus] = match phase.key {
                "flow-analysis" => state.flow_analysts.as_slice(),
                "requirements-mapping" => state.requirements_mappers.as_slice(),
                _ => &[],
            };
            if !agents.is_empty() {
                frame.line(agent_line(agents));
            }
        }
        frame.blank();

        if progress.complete {
            frame.line("  ✓ Map Complete".green().bold().to_string());
            frame.line(format!(
                "    {}{}",
                "→ ".dim(),
                format!(
                    ".ocr/sessions/{}/{MAP_DIR}/{RUNS_DIR}/{RUN_PREFIX}-{}/{MAP_FILE}",
                    progress.session, state.current_run
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
        render::waiting_frame(FrameKind::MapWaiting, Some(" · Map"), &["/ocr-map"])
    }
}

fn phase_complete(state: &MapState, key: &str) -> bool {
    match key {
        "map-context" => state.context_complete,
        "topology" => state.topology_complete,
        "flow-analysis" => state.flow_analysis_complete,
        "requirements-mapping" => state.requirements_mapping_complete,
        "synthesis" => state.synthesis_complete,
        COMPLETE_PHASE => state.progress.complete,
        _ => false,
    }
}

fn agent_line(agents: &[AgentStatus]) -> String {
    let entries: Vec<String> = agents
        .iter()
        .map(|agent| {
            format!(
                "{} {}",
                render::agent_icon(agent.status),
                agent.display_name.as_str().dim()
            )
        })
        .collect();
    format!("    {}", entries.join(&render::agent_separator()))
}

/// Every `run-<n>` directory, ascending.
fn derive_runs(runs_dir: &Path) -> Vec<MapRunInfo> {
    artifacts::numbered_dirs(runs_dir, RUN_PREFIX)
        .into_iter()
        .map(|(run, path)| MapRunInfo {
            run,
            is_complete: path.join(MAP_FILE).exists(),
            file_count: artifacts::canonical_file_count(&path.join(TOPOLOGY_FILE)),
        })
        .collect()
}

/// Per-agent files in `agent_dir`, or a single aggregate entry when only the
/// merged phase artifact exists.
fn derive_agents(agent_dir: &Path, aggregate: Option<(&str, &str)>) -> Vec<AgentStatus> {
    let files = artifacts::markdown_files(agent_dir);
    if !files.is_empty() {
        return files
            .into_iter()
            .map(|file| AgentStatus {
                name: artifacts::file_stem(&file).to_string(),
                display_name: artifacts::format_agent_name(&file),
                status: PhaseStatus::Complete,
            })
            .collect();
    }

    aggregate
        .map(|(name, display_name)| AgentStatus {
            name: name.to_string(),
            display_name: display_name.to_string(),
            status: PhaseStatus::Complete,
        })
        .into_iter()
        .collect()
}
