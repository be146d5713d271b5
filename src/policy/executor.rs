//! Removal executor: best-effort, strictly sequential deletion of the targets
//! selected by a level.
//!
//! Every path is attempted exactly once. A failure (missing path, denied
//! delete) is logged and recorded, then the next path runs; nothing is
//! retried and nothing aborts the sequence.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::errors::MdsError;
use crate::core::level::CleanupLevel;
use crate::logger::activity::ActivityLog;
use crate::logger::console::StepOutput;
use crate::platform::pal::Platform;
use crate::policy::targets::{RemovalTarget, targets_for};

/// Why a single path could not be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalFailure {
    pub error_code: String,
    pub message: String,
    /// The path was already absent.
    pub missing: bool,
}

impl From<&MdsError> for RemovalFailure {
    fn from(error: &MdsError) -> Self {
        Self {
            error_code: error.code().to_string(),
            message: error.to_string(),
            missing: matches!(error, MdsError::PathMissing { .. }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathOutcome {
    pub path: PathBuf,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RemovalFailure>,
}

impl PathOutcome {
    #[must_use]
    pub fn removed(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetOutcome {
    pub label: &'static str,
    pub tier: u8,
    pub paths: Vec<PathOutcome>,
}

/// Result of one policy run.
#[derive(Debug, Clone, Serialize)]
pub struct RemovalReport {
    pub level: CleanupLevel,
    pub targets: Vec<TargetOutcome>,
    #[serde(serialize_with = "serialize_duration_ms")]
    pub duration: Duration,
}

impl RemovalReport {
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        self.targets.iter().map(|t| t.label).collect()
    }

    fn path_outcomes(&self) -> impl Iterator<Item = &PathOutcome> {
        self.targets.iter().flat_map(|t| t.paths.iter())
    }

    #[must_use]
    pub fn attempted(&self) -> usize {
        self.path_outcomes().count()
    }

    #[must_use]
    pub fn removed(&self) -> usize {
        self.path_outcomes().filter(|p| p.removed()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.attempted() - self.removed()
    }
}

/// Runs the fixed removal table against a platform.
pub struct RemovalPolicy<'a> {
    platform: &'a dyn Platform,
}

impl<'a> RemovalPolicy<'a> {
    #[must_use]
    pub fn new(platform: &'a dyn Platform) -> Self {
        Self { platform }
    }

    /// Remove every target whose tier is at or below `level`, in table order.
    pub fn execute(
        &self,
        level: CleanupLevel,
        out: &mut dyn StepOutput,
        activity: &mut ActivityLog,
    ) -> RemovalReport {
        let start = Instant::now();
        let mut targets = Vec::new();
        for target in targets_for(level) {
            targets.push(self.remove_target(target, out, activity));
        }
        RemovalReport {
            level,
            targets,
            duration: start.elapsed(),
        }
    }

    fn remove_target(
        &self,
        target: &RemovalTarget,
        out: &mut dyn StepOutput,
        activity: &mut ActivityLog,
    ) -> TargetOutcome {
        out.info(&format!("Removing {}...", target.label));
        let mut paths = Vec::with_capacity(target.paths.len());
        for path in target.path_iter() {
            let started = Instant::now();
            let result = self.platform.remove_tree(path);
            let duration_ms = elapsed_ms(started);
            let failure = match result {
                Ok(()) => {
                    activity.target_removed(target.label, path, duration_ms);
                    None
                }
                Err(error) => {
                    let failure = RemovalFailure::from(&error);
                    if failure.missing {
                        out.warn(&format!(
                            "Warning: {} not present, skipping",
                            path.display()
                        ));
                    } else {
                        out.warn(&format!(
                            "Warning: Failed to remove {}: {error}",
                            path.display()
                        ));
                    }
                    activity.target_failed(target.label, path, &error);
                    Some(failure)
                }
            };
            paths.push(PathOutcome {
                path: path.to_path_buf(),
                duration_ms,
                failure,
            });
        }
        TargetOutcome {
            label: target.label,
            tier: target.tier,
            paths,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[allow(clippy::cast_possible_truncation, clippy::trivially_copy_pass_by_ref)]
fn serialize_duration_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}
