//! Pre-job step: validate the level, hand off state, measure, remove, measure.

#![allow(missing_docs)]

use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::core::errors::Result;
use crate::core::level::CleanupLevel;
use crate::logger::activity::ActivityLog;
use crate::logger::console::StepOutput;
use crate::logger::jsonl::Severity;
use crate::platform::env::EnvironmentFacts;
use crate::platform::pal::Platform;
use crate::policy::executor::{RemovalPolicy, RemovalReport};
use crate::state::channel::StateChannel;
use crate::state::persisted::PersistedState;

/// Inputs gathered by the caller before the step runs.
#[derive(Debug, Clone)]
pub struct PreStepInput<'a> {
    /// Operator-supplied level, unvalidated.
    pub raw_level: &'a str,
    pub facts: EnvironmentFacts,
    /// Filesystem whose free space is accounted.
    pub root: &'a Path,
    pub config_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// Non-Linux runner: nothing measured, nothing removed.
    UnsupportedPlatform,
    Completed {
        before_gib: u64,
        after_gib: u64,
        freed_gib: i64,
        /// `None` on self-hosted or unknown runners.
        removal: Option<RemovalReport>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PreStepSummary {
    pub level: CleanupLevel,
    pub facts: EnvironmentFacts,
    pub outcome: CleanupOutcome,
}

/// Run the pre-job step.
///
/// Fails only on an invalid level (before anything is written or removed),
/// on a state channel that cannot be written, or on a failed measurement.
/// Individual removal failures are logged and never surface here.
pub fn run_pre_step(
    input: &PreStepInput<'_>,
    platform: &dyn Platform,
    state: &mut dyn StateChannel,
    out: &mut dyn StepOutput,
    activity: &mut ActivityLog,
) -> Result<PreStepSummary> {
    let started = Instant::now();
    let level = CleanupLevel::parse(input.raw_level)?;
    let facts = input.facts;

    out.info(&format!("More Disk Space - Level {level} cleanup"));
    out.blank();

    PersistedState::new(level, facts).persist(state)?;
    activity.cleanup_start(level, facts, input.config_hash.clone());

    if !facts.supported_platform {
        out.info("Unsupported platform; skipping cleanup");
        activity.cleanup_skipped(level, facts, "unsupported platform");
        return Ok(PreStepSummary {
            level,
            facts,
            outcome: CleanupOutcome::UnsupportedPlatform,
        });
    }

    let before_gib = measure(platform, input.root, activity)?;
    out.info(&format!("Available space before: {before_gib} GiB"));
    out.blank();

    let removal = if facts.github_hosted {
        Some(RemovalPolicy::new(platform).execute(level, out, activity))
    } else {
        out.info("Self-hosted or unknown runner; skipping removal");
        activity.cleanup_skipped(level, facts, "not a hosted runner");
        None
    };

    let after_gib = measure(platform, input.root, activity)?;
    let freed_gib = delta_gib(before_gib, after_gib);

    out.blank();
    out.info("Cleanup complete!");
    out.info(&format!("Available space after: {after_gib} GiB"));
    out.info(&format!("Space freed: {freed_gib} GiB"));

    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = started.elapsed().as_millis() as u64;
    activity.cleanup_complete(level, before_gib, after_gib, freed_gib, duration_ms);

    Ok(PreStepSummary {
        level,
        facts,
        outcome: CleanupOutcome::Completed {
            before_gib,
            after_gib,
            freed_gib,
            removal,
        },
    })
}

fn measure(platform: &dyn Platform, root: &Path, activity: &mut ActivityLog) -> Result<u64> {
    platform.available_gib(root).inspect_err(|error| {
        activity.error(error, Severity::Critical);
    })
}

/// `after - before` as a signed value.
fn delta_gib(before: u64, after: u64) -> i64 {
    if after >= before {
        i64::try_from(after - before).unwrap_or(i64::MAX)
    } else {
        i64::try_from(before - after).map_or(i64::MIN, |lost| -lost)
    }
}
