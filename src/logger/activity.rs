//! Activity log: typed constructors for the JSONL events each step emits.

#![allow(missing_docs)]

use std::path::Path;

use crate::core::errors::MdsError;
use crate::core::level::CleanupLevel;
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use crate::platform::env::EnvironmentFacts;

/// Optional structured log. A disabled log accepts and drops every event.
pub struct ActivityLog {
    writer: Option<JsonlWriter>,
    image: Option<String>,
}

impl ActivityLog {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            writer: None,
            image: None,
        }
    }

    /// Log to `path`, switching to `fallback` if `path` cannot be written.
    #[must_use]
    pub fn open(path: &Path, fallback: Option<&Path>) -> Self {
        let config = JsonlConfig::new(path).with_fallback(fallback.map(Path::to_path_buf));
        Self {
            writer: Some(JsonlWriter::open(config)),
            image: None,
        }
    }

    /// Open `path` when given, otherwise disabled.
    #[must_use]
    pub fn open_optional(path: Option<&Path>, fallback: Option<&Path>) -> Self {
        path.map_or_else(Self::disabled, |path| Self::open(path, fallback))
    }

    /// Stamp every subsequent record with the runner image.
    #[must_use]
    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    pub fn record(&mut self, mut entry: LogEntry) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if entry.image.is_none() {
            entry.image.clone_from(&self.image);
        }
        writer.write_entry(&entry);
    }

    pub fn cleanup_start(
        &mut self,
        level: CleanupLevel,
        facts: EnvironmentFacts,
        config_hash: Option<String>,
    ) {
        let mut entry = LogEntry::new(EventType::CleanupStart, Severity::Info);
        entry.level = Some(level.get());
        entry.github_hosted = Some(facts.github_hosted);
        entry.supported_platform = Some(facts.supported_platform);
        entry.config_hash = config_hash;
        self.record(entry);
    }

    pub fn cleanup_skipped(&mut self, level: CleanupLevel, facts: EnvironmentFacts, reason: &str) {
        let mut entry = LogEntry::new(EventType::CleanupSkipped, Severity::Info);
        entry.level = Some(level.get());
        entry.github_hosted = Some(facts.github_hosted);
        entry.supported_platform = Some(facts.supported_platform);
        entry.details = Some(reason.to_string());
        self.record(entry);
    }

    pub fn target_removed(&mut self, label: &str, path: &Path, duration_ms: u64) {
        let mut entry = LogEntry::new(EventType::TargetRemoved, Severity::Info);
        entry.label = Some(label.to_string());
        entry.path = Some(path.to_string_lossy().into_owned());
        entry.duration_ms = Some(duration_ms);
        entry.ok = Some(true);
        self.record(entry);
    }

    pub fn target_failed(&mut self, label: &str, path: &Path, error: &MdsError) {
        let mut entry = LogEntry::new(EventType::TargetRemovalFailed, Severity::Warning);
        entry.label = Some(label.to_string());
        entry.path = Some(path.to_string_lossy().into_owned());
        entry.ok = Some(false);
        entry.error_code = Some(error.code().to_string());
        entry.error_message = Some(error.to_string());
        self.record(entry);
    }

    pub fn cleanup_complete(
        &mut self,
        level: CleanupLevel,
        before_gib: u64,
        after_gib: u64,
        freed_gib: i64,
        duration_ms: u64,
    ) {
        let mut entry = LogEntry::new(EventType::CleanupComplete, Severity::Info);
        entry.level = Some(level.get());
        entry.before_gib = Some(before_gib);
        entry.after_gib = Some(after_gib);
        entry.freed_gib = Some(freed_gib);
        entry.duration_ms = Some(duration_ms);
        entry.ok = Some(true);
        self.record(entry);
    }

    pub fn space_report(&mut self, level: CleanupLevel, available_gib: u64) {
        let mut entry = LogEntry::new(EventType::SpaceReport, Severity::Info);
        entry.level = Some(level.get());
        entry.available_gib = Some(available_gib);
        self.record(entry);
    }

    pub fn error(&mut self, error: &MdsError, severity: Severity) {
        let mut entry = LogEntry::new(EventType::Error, severity);
        entry.error_code = Some(error.code().to_string());
        entry.error_message = Some(error.to_string());
        self.record(entry);
    }
}
