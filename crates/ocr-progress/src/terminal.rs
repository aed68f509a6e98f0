//! In-place terminal updater.
//!
//! Keeps one region of the terminal showing the latest [`Frame`]. Each draw
//! moves the cursor back to the top of the region and overwrites it line by
//! line, so the scrollback never fills with stale frames. A frame of a
//! different [`FrameKind`] than the previous one erases the whole region
//! first.

use std::io::{self, IsTerminal, Stdout, Write};

use crossterm::{
    cursor::{Hide, MoveToPreviousLine, Show},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use ocr_core::{Frame, FrameKind};

/// Draws frames into `W`, tracking what is currently on screen.
#[derive(Debug)]
pub struct FrameRenderer<W: Write> {
    out: W,
    /// Cursor control and styling are only emitted to a terminal.
    interactive: bool,
    last_kind: Option<FrameKind>,
    /// Height of the previous frame after padding.
    last_line_count: usize,
    /// Lines below which the cursor currently sits.
    drawn_lines: usize,
    /// Last frame written in non-interactive mode, to skip repeats.
    last_plain: Option<Vec<String>>,
    cursor_hidden: bool,
}

impl FrameRenderer<Stdout> {
    /// A renderer on stdout, interactive when stdout is a terminal.
    pub fn stdout() -> Self {
        let stdout = io::stdout();
        let interactive = stdout.is_terminal();
        Self::new(stdout, interactive)
    }
}

impl<W: Write> FrameRenderer<W> {
    pub fn new(out: W, interactive: bool) -> Self {
        Self {
            out,
            interactive,
            last_kind: None,
            last_line_count: 0,
            drawn_lines: 0,
            last_plain: None,
            cursor_hidden: false,
        }
    }

    /// Replaces the region with `frame`.
    pub fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        let kind_changed = self.last_kind.is_some_and(|kind| kind != frame.kind);
        self.last_kind = Some(frame.kind);

        if !self.interactive {
            return self.draw_plain(frame);
        }

        let mut lines: Vec<&str> = frame.lines.iter().map(String::as_str).collect();
        if lines.len() < self.last_line_count {
            lines.resize(self.last_line_count, "");
        }
        self.last_line_count = lines.len();

        if !self.cursor_hidden {
            queue!(self.out, Hide)?;
            self.cursor_hidden = true;
        }
        self.rewind()?;
        if kind_changed {
            queue!(self.out, Clear(ClearType::FromCursorDown))?;
        }
        for line in &lines {
            queue!(
                self.out,
                Print(line),
                Clear(ClearType::UntilNewLine),
                Print("\n")
            )?;
        }
        self.drawn_lines = lines.len();
        self.out.flush()
    }

    /// Leaves the last frame on screen and restores the cursor.
    ///
    /// The next draw starts a fresh region below it.
    pub fn done(&mut self) -> io::Result<()> {
        if self.cursor_hidden {
            queue!(self.out, Show)?;
            self.cursor_hidden = false;
        }
        self.reset();
        self.out.flush()
    }

    /// Forgets every piece of render bookkeeping.
    pub fn reset(&mut self) {
        self.last_kind = None;
        self.last_line_count = 0;
        self.drawn_lines = 0;
        self.last_plain = None;
    }

    pub fn last_kind(&self) -> Option<FrameKind> {
        self.last_kind
    }

    pub fn last_line_count(&self) -> usize {
        self.last_line_count
    }

    /// Borrows the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn rewind(&mut self) -> io::Result<()> {
        if self.drawn_lines > 0 {
            let up = u16::try_from(self.drawn_lines).unwrap_or(u16::MAX);
            queue!(self.out, MoveToPreviousLine(up))?;
        }
        Ok(())
    }

    fn draw_plain(&mut self, frame: &Frame) -> io::Result<()> {
        let lines = frame.plain_lines();
        if self.last_plain.as_ref() == Some(&lines) {
            return Ok(());
        }
        for line in &lines {
            writeln!(self.out, "{line}")?;
        }
        self.last_line_count = lines.len();
        self.last_plain = Some(lines);
        self.out.flush()
    }
}
