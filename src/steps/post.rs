//! Post-job step: report free space and suggest a level. Never fails.

#![allow(missing_docs)]

use std::path::Path;

use serde::Serialize;

use crate::logger::activity::ActivityLog;
use crate::logger::console::StepOutput;
use crate::logger::jsonl::Severity;
use crate::platform::pal::Platform;
use crate::report::advice::{Advice, advise};
use crate::state::channel::StateChannel;
use crate::state::persisted::PersistedState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    /// Pre-step ran on an unsupported platform; nothing measured.
    UnsupportedPlatform,
    Reported {
        available_gib: u64,
        /// `None` on self-hosted or unknown runners.
        advice: Option<Advice>,
    },
    /// Measurement failed; downgraded to a warning.
    MeasurementFailed { error_code: String, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PostStepSummary {
    pub state: PersistedState,
    pub outcome: ReportOutcome,
}

/// Run the post-job step. Every failure is reported as a warning and folded
/// into the returned summary.
pub fn run_post_step(
    state: &dyn StateChannel,
    root: &Path,
    platform: &dyn Platform,
    out: &mut dyn StepOutput,
    activity: &mut ActivityLog,
) -> PostStepSummary {
    out.blank();
    out.info("Final disk space report");
    out.info("==========================");

    let persisted = PersistedState::read(state);

    if !persisted.supported_platform {
        out.info("Unsupported platform; skipping disk space report");
        out.blank();
        return PostStepSummary {
            state: persisted,
            outcome: ReportOutcome::UnsupportedPlatform,
        };
    }

    let available_gib = match platform.available_gib(root) {
        Ok(value) => value,
        Err(error) => {
            out.warn("Warning: Failed to report final disk space");
            out.warn(&error.to_string());
            activity.error(&error, Severity::Warning);
            return PostStepSummary {
                state: persisted,
                outcome: ReportOutcome::MeasurementFailed {
                    error_code: error.code().to_string(),
                    message: error.to_string(),
                },
            };
        }
    };

    out.info(&format!("Available space: {available_gib} GiB"));
    out.blank();
    activity.space_report(persisted.level, available_gib);

    let advice = persisted.github_hosted.then(|| {
        let advice = advise(available_gib, persisted.level);
        for (severity, text) in advice.lines() {
            out.line(severity, &text);
        }
        advice
    });

    PostStepSummary {
        state: persisted,
        outcome: ReportOutcome::Reported {
            available_gib,
            advice,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::CleanupLevel;
    use crate::logger::console::RecordingOutput;
    use crate::platform::pal::MockPlatform;
    use crate::state::channel::MemoryStateChannel;

    fn channel(level: u8, github_hosted: bool, supported_platform: bool) -> MemoryStateChannel {
        let mut channel = MemoryStateChannel::new();
        PersistedState {
            level: CleanupLevel::new(level).unwrap(),
            github_hosted,
            supported_platform,
        }
        .persist(&mut channel)
        .unwrap();
        channel
    }

    fn run(state: &MemoryStateChannel, mock: &MockPlatform) -> (PostStepSummary, RecordingOutput) {
        let mut out = RecordingOutput::new();
        let summary = run_post_step(
            state,
            Path::new("/"),
            mock,
            &mut out,
            &mut ActivityLog::disabled(),
        );
        (summary, out)
    }

    #[test]
    fn hosted_run_prints_advice_band() {
        let mock = MockPlatform::new().with_samples([3]);
        let (summary, out) = run(&channel(2, true, true), &mock);

        assert!(matches!(
            summary.outcome,
            ReportOutcome::Reported {
                available_gib: 3,
                advice: Some(Advice::LowSpace { .. }),
            }
        ));
        assert!(out.contains("Available space: 3 GiB"));
        assert!(out.contains("Consider increasing to level 3"));
    }

    #[test]
    fn boundary_values_pick_the_right_band() {
        for (free, expected) in [
            (4, "Less than 5 GiB"),
            (5, "Moderate buffer"),
            (9, "Moderate buffer"),
            (10, "Good buffer"),
        ] {
            let mock = MockPlatform::new().with_samples([free]);
            let (_, out) = run(&channel(2, true, true), &mock);
            assert!(out.contains(expected), "free {free}: {}", out.text());
        }
    }

    #[test]
    fn empty_channel_is_treated_as_unsupported() {
        let mock = MockPlatform::new().with_samples([50]);
        let (summary, out) = run(&MemoryStateChannel::new(), &mock);

        assert!(matches!(summary.outcome, ReportOutcome::UnsupportedPlatform));
        assert_eq!(summary.state, PersistedState::default());
        assert_eq!(mock.measure_count(), 0);
        assert!(out.contains("Unsupported platform"));
        assert!(!out.contains("Available space"));
    }

    #[test]
    fn self_hosted_reports_space_without_advice() {
        let mock = MockPlatform::new().with_samples([2]);
        let (summary, out) = run(&channel(2, false, true), &mock);

        assert_eq!(mock.measure_count(), 1);
        assert!(matches!(
            summary.outcome,
            ReportOutcome::Reported { advice: None, .. }
        ));
        assert!(out.contains("Available space: 2 GiB"));
        for band in ["Less than", "Moderate buffer", "Good buffer"] {
            assert!(!out.contains(band), "unexpected {band}");
        }
    }

    #[test]
    fn measurement_failure_becomes_a_warning() {
        let mock = MockPlatform::new().with_measurement_failure("df: command not found");
        let (summary, out) = run(&channel(3, true, true), &mock);

        assert!(matches!(
            summary.outcome,
            ReportOutcome::MeasurementFailed { .. }
        ));
        let warnings = out.warnings();
        assert_eq!(warnings[0], "Warning: Failed to report final disk space");
        assert!(warnings[1].contains("df: command not found"));
    }

    #[test]
    fn max_level_low_space_points_to_alternatives() {
        let mock = MockPlatform::new().with_samples([1]);
        let (_, out) = run(&channel(4, true, true), &mock);
        assert!(out.contains("alternative actions"));
        assert!(!out.contains("increasing to level"));
    }

    #[test]
    fn min_level_good_buffer_says_action_may_be_unneeded() {
        let mock = MockPlatform::new().with_samples([60]);
        let (_, out) = run(&channel(1, true, true), &mock);
        assert!(out.contains("may not need this action"));
    }
}
