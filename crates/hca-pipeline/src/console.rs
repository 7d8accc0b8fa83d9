//! Operator transcript: progress lines, stage checkmarks and warnings.
//!
//! This is the human-facing stream (stdout by default). Structured logs go
//! through `tracing` separately.

use console::{style, StyledObject, Term};
use std::fmt::Display;
use std::io::Write;
use std::time::Instant;

use crate::progress;

pub struct Console {
    out: Box<dyn Write + Send>,
    progress_open: bool,
    styled: bool,
}

impl Console {
    /// Styled when stdout is a terminal that supports colours.
    pub fn stdout() -> Self {
        Self {
            styled: Term::stdout().features().colors_supported(),
            ..Self::with_writer(std::io::stdout())
        }
    }

    /// Plain text, no ANSI styling.
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Box::new(writer),
            progress_open: false,
            styled: false,
        }
    }

    /// Overwrite the progress line for item `current` of `total`.
    pub fn progress(&mut self, current: usize, total: usize, start: Instant, label: &str) {
        progress::report(&mut *self.out, current, total, start, label);
        self.progress_open = true;
    }

    pub fn line(&mut self, msg: impl Display) {
        self.close_progress();
        let _ = writeln!(self.out, "{msg}");
    }

    pub fn banner(&mut self, title: &str) {
        self.close_progress();
        let _ = writeln!(self.out, "\n=== {title} ===\n");
    }

    /// Stage completion line.
    pub fn done(&mut self, msg: impl Display) {
        let mark = self.paint(style("✔").green());
        self.line(format!("{mark} {msg}"));
    }

    /// Recovered, per-item failure.
    pub fn warn(&mut self, msg: impl Display) {
        let mark = self.paint(style("⚠").yellow());
        self.line(format!("{mark} {msg}"));
    }

    /// Fatal diagnostic.
    pub fn fail(&mut self, msg: impl Display) {
        let mark = self.paint(style("✘").red().bold());
        self.line(format!("{mark} {msg}"));
    }

    fn paint(&self, mark: StyledObject<&'static str>) -> StyledObject<&'static str> {
        mark.force_styling(self.styled)
    }

    fn close_progress(&mut self) {
        if self.progress_open {
            let _ = writeln!(self.out);
            self.progress_open = false;
        }
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hca_test_utils::SharedBuffer;

    #[test]
    fn test_progress_line_is_terminated_before_next_message() {
        let buf = SharedBuffer::new();
        let mut console = Console::with_writer(buf.clone());
        console.progress(1, 1, Instant::now(), "Loading");
        console.done("FTMap structures loaded");
        let text = buf.contents();
        assert!(text.contains("1/1"));
        assert!(text.ends_with("\n✔ FTMap structures loaded\n"));
        assert_eq!(text.matches('\n').count(), 2);
    }

    #[test]
    fn test_warning_line() {
        let buf = SharedBuffer::new();
        let mut console = Console::with_writer(buf.clone());
        console.warn("Alignment failed for holo: no atoms");
        assert_eq!(buf.contents(), "⚠ Alignment failed for holo: no atoms\n");
    }

    #[test]
    fn test_styled_console_colours_marks() {
        let buf = SharedBuffer::new();
        let mut console = Console::with_writer(buf.clone());
        console.styled = true;
        console.done("ok");
        let text = buf.contents();
        assert!(text.starts_with("\u{1b}["));
        assert!(text.contains("✔"));
    }
}
