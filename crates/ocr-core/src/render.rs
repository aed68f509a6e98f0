//! Frame formatting shared by every workflow view.
//!
//! A [`Frame`] is just an ordered list of already-styled lines plus the kind
//! of view that produced it. Putting it on screen is the terminal updater's
//! job; nothing in here touches stdout.

use crossterm::style::Stylize;

use crate::model::PhaseStatus;

/// Application title shown at the top of every frame.
pub const TITLE: &str = "Open Code Review";

/// Cells in the full-size progress bar.
pub const BAR_WIDTH: usize = 24;

/// Cells in the compact per-workflow bar of the combined view.
pub const COMPACT_BAR_WIDTH: usize = 10;

const FILLED_CELL: &str = "━";
const EMPTY_CELL: &str = "─";

/// Which view produced a frame.
///
/// A change of kind between two consecutive frames forces a full clear
/// instead of an in-place repaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    ReviewProgress,
    ReviewWaiting,
    MapProgress,
    MapWaiting,
    GenericWaiting,
    Combined,
}

/// One rendered screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub lines: Vec<String>,
}

impl Frame {
    pub fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
        }
    }

    /// Appends a line.
    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Appends an empty line.
    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// The frame's lines with terminal styling removed.
    pub fn plain_lines(&self) -> Vec<String> {
        self.lines.iter().map(|l| strip_ansi(l)).collect()
    }

    /// The whole frame as unstyled text.
    pub fn plain_text(&self) -> String {
        self.plain_lines().join("\n")
    }
}

/// Removes CSI escape sequences (`ESC [ ... final-byte`).
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&c) {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Formats milliseconds as `1h 2m 3s`, `2m 3s` or `3s`. Negative is 0.
pub fn format_duration(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Rounded completion percentage, clamped to 0..=100.
pub fn percent(current: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let ratio = f64::from(current.min(total)) / f64::from(total);
    (ratio * 100.0).round() as u32
}

fn filled_cells(current: u32, total: u32, width: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let ratio = f64::from(current.min(total)) / f64::from(total);
    ((ratio * width as f64).round() as usize).min(width)
}

/// The 24-cell bar followed by the percentage and an optional phase label.
pub fn progress_bar(current: u32, total: u32, label: Option<&str>) -> String {
    let filled = filled_cells(current, total, BAR_WIDTH);
    let bar = format!(
        "{}{}",
        FILLED_CELL.repeat(filled).green(),
        EMPTY_CELL.repeat(BAR_WIDTH - filled).dim()
    );
    let percent_str = format!("{}%", percent(current, total)).bold().white();
    match label {
        Some(label) => format!("{bar}  {percent_str} {} {}", "·".dim(), label.cyan()),
        None => format!("{bar}  {percent_str}"),
    }
}

/// An empty 24-cell bar at 0%, used by waiting frames.
pub fn empty_progress_bar() -> String {
    format!("{}  {}", EMPTY_CELL.repeat(BAR_WIDTH).dim(), "0%".dim())
}

/// Unstyled filled and empty runs of the 10-cell combined-view bar.
///
/// The caller colors the filled run per workflow.
pub fn compact_bar(percent: u32) -> (String, String) {
    let filled = ((f64::from(percent.min(100)) / 10.0).round() as usize).min(COMPACT_BAR_WIDTH);
    (
        FILLED_CELL.repeat(filled),
        EMPTY_CELL.repeat(COMPACT_BAR_WIDTH - filled),
    )
}

/// The unfilled compact bar.
pub fn empty_compact_bar() -> String {
    EMPTY_CELL.repeat(COMPACT_BAR_WIDTH)
}

/// Glyph for a phase row: done, current or pending.
pub fn phase_glyph(is_complete: bool, is_current: bool) -> String {
    match PhaseStatus::from_flags(is_complete, is_current) {
        PhaseStatus::Complete => "✓".green().to_string(),
        PhaseStatus::InProgress => "▸".cyan().to_string(),
        PhaseStatus::Pending => "·".dim().to_string(),
    }
}

/// A phase label styled by its status.
pub fn phase_label(label: &str, is_complete: bool, is_current: bool) -> String {
    if is_current {
        label.cyan().bold().to_string()
    } else if is_complete {
        label.white().to_string()
    } else {
        label.dim().to_string()
    }
}

/// Icon for a sub-agent entry.
pub fn agent_icon(status: PhaseStatus) -> String {
    match status {
        PhaseStatus::Complete => "✓".green().to_string(),
        PhaseStatus::InProgress | PhaseStatus::Pending => "○".dim().to_string(),
    }
}

/// Separator placed between sub-agent entries on one line.
pub fn agent_separator() -> String {
    "  │  ".dim().to_string()
}

/// Title line, with an optional cyan suffix such as `" · Map"`.
pub fn title_line(suffix: Option<&str>) -> String {
    let title = format!("  {TITLE}").bold().white().to_string();
    match suffix {
        Some(suffix) => format!("{title}{}", suffix.cyan()),
        None => title,
    }
}

/// The `Ctrl+C to exit` hint.
pub fn exit_hint() -> String {
    "  Ctrl+C to exit".dim().to_string()
}

/// `  Run <command> to start` hint for waiting frames.
pub fn start_hint(commands: &[&str]) -> String {
    let mut line = "  Run ".dim().to_string();
    for (i, command) in commands.iter().enumerate() {
        if i > 0 {
            line.push_str(&" or ".dim().to_string());
        }
        line.push_str(&command.white().to_string());
    }
    line.push_str(&" to start".dim().to_string());
    line
}

/// The placeholder frame shown while no session state is available.
pub fn waiting_frame(kind: FrameKind, title_suffix: Option<&str>, commands: &[&str]) -> Frame {
    let mut frame = Frame::new(kind);
    frame.blank();
    frame.line(title_line(title_suffix));
    frame.blank();
    frame.line("  Waiting for session...".dim().to_string());
    frame.blank();
    frame.line(format!("  {}", empty_progress_bar()));
    frame.blank();
    frame.line(start_hint(commands));
    frame.blank();
    frame.line(exit_hint());
    frame.blank();
    frame
}

/// Plural suffix helper: `1 finding`, `2 findings`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
