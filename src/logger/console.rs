//! Human-facing step output.

use crate::logger::jsonl::Severity;

/// Sink for the human-readable lines a step prints.
///
/// The CLI renders to stdout/stderr with colors; tests record lines.
pub trait StepOutput {
    fn line(&mut self, severity: Severity, text: &str);

    fn info(&mut self, text: &str) {
        self.line(Severity::Info, text);
    }

    fn warn(&mut self, text: &str) {
        self.line(Severity::Warning, text);
    }

    fn error(&mut self, text: &str) {
        self.line(Severity::Critical, text);
    }

    fn blank(&mut self) {
        self.line(Severity::Info, "");
    }
}

/// Collects lines in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingOutput {
    pub lines: Vec<(Severity, String)>,
}

impl RecordingOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded text joined with newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|(_, text)| text.contains(needle))
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(severity, _)| *severity == Severity::Warning)
            .map(|(_, text)| text.as_str())
            .collect()
    }
}

impl StepOutput for RecordingOutput {
    fn line(&mut self, severity: Severity, text: &str) {
        self.lines.push((severity, text.to_string()));
    }
}
