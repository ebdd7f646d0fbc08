//! Terminal run log

use std::io::{self, IsTerminal, Write};
use upgrade_core::UpgradeLogger;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Where progress lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// Prints run progress, with ANSI styling when the stream is a terminal
#[derive(Debug, Clone, Copy)]
pub struct ConsoleLogger {
    stream: Stream,
    color: bool,
}

impl ConsoleLogger {
    /// Create logger
    #[must_use]
    pub fn new(stream: Stream, color: bool) -> Self {
        Self { stream, color }
    }

    /// Style only when `stream` is attached to a terminal
    #[must_use]
    pub fn detect(stream: Stream) -> Self {
        let color = match stream {
            Stream::Stdout => io::stdout().is_terminal(),
            Stream::Stderr => io::stderr().is_terminal(),
        };
        Self::new(stream, color)
    }

    fn paint(&self, style: &str, text: &str) -> String {
        if self.color {
            format!("{style}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn emit(&self, line: &str) {
        let written = match self.stream {
            Stream::Stdout => writeln!(io::stdout().lock(), "{line}"),
            Stream::Stderr => writeln!(io::stderr().lock(), "{line}"),
        };
        written.ok();
    }
}

impl UpgradeLogger for ConsoleLogger {
    fn plain(&self, message: &str) {
        self.emit(message);
    }

    fn warn(&self, message: &str) {
        self.emit(&self.paint(YELLOW, message));
    }

    fn newline(&self) {
        self.emit("");
    }

    fn bold(&self, parts: &[&str]) -> String {
        self.paint(BOLD, &parts.join(" "))
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }
}
