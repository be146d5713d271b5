//! Terminal rendering shared by the `mds` binary.
#![allow(missing_docs)]

use std::io::{self, Write};

use colored::Colorize;

use crate::logger::console::StepOutput;
use crate::logger::jsonl::Severity;

/// Writes step lines to a pair of streams. Info goes to `out`, warnings
/// (yellow) and errors (bold red) go to `err`.
pub struct ConsoleOutput {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl ConsoleOutput {
    #[must_use]
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self { out, err }
    }

    /// stdout for info, stderr for the rest.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Everything on stderr, leaving stdout free for a JSON document.
    #[must_use]
    pub fn stderr_only() -> Self {
        Self::new(Box::new(io::stderr()), Box::new(io::stderr()))
    }
}

impl StepOutput for ConsoleOutput {
    fn line(&mut self, severity: Severity, text: &str) {
        // A closed pipe must not abort a step.
        let _ = match severity {
            Severity::Info => writeln!(self.out, "{text}"),
            Severity::Warning => writeln!(self.err, "{}", text.yellow()),
            Severity::Critical => writeln!(self.err, "{}", text.red().bold()),
        };
    }
}

impl Drop for ConsoleOutput {
    fn drop(&mut self) {
        let _ = self.out.flush();
        let _ = self.err.flush();
    }
}
