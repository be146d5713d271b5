//! Property-based tests for level monotonicity, failure isolation, advice
//! coverage, and state hand-off.

use std::collections::BTreeSet;
use std::path::PathBuf;

use proptest::prelude::*;

use super::post::{ReportOutcome, run_post_step};
use super::pre::{CleanupOutcome, PreStepInput, run_pre_step};
use crate::core::level::CleanupLevel;
use crate::logger::activity::ActivityLog;
use crate::logger::console::RecordingOutput;
use crate::platform::env::EnvironmentFacts;
use crate::platform::pal::MockPlatform;
use crate::policy::targets::{REMOVAL_TARGETS, targets_for};
use crate::report::advice::{Advice, advise};
use crate::state::channel::MemoryStateChannel;
use crate::state::persisted::PersistedState;

// ──────────────────── strategies ────────────────────

fn arb_level() -> impl Strategy<Value = CleanupLevel> {
    (1u8..=4).prop_map(|n| CleanupLevel::new(n).unwrap())
}

fn arb_facts() -> impl Strategy<Value = EnvironmentFacts> {
    (any::<bool>(), any::<bool>()).prop_map(|(github_hosted, supported_platform)| {
        EnvironmentFacts {
            github_hosted,
            supported_platform,
        }
    })
}

fn all_paths() -> Vec<&'static str> {
    REMOVAL_TARGETS
        .iter()
        .flat_map(|t| t.paths.iter().copied())
        .collect()
}

fn labels_at(level: CleanupLevel) -> BTreeSet<&'static str> {
    targets_for(level).map(|t| t.label).collect()
}

// ──────────────────── properties ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A higher level never removes fewer targets.
    #[test]
    fn selection_is_monotonic(a in arb_level(), b in arb_level()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(labels_at(low).is_subset(&labels_at(high)));
    }

    /// Any subset of failing paths leaves every other path attempted.
    #[test]
    fn failures_are_isolated(
        level in arb_level(),
        denied in prop::collection::vec(any::<bool>(), 8),
    ) {
        let paths = all_paths();
        let mut mock = MockPlatform::new().with_samples([10, 12]);
        for (path, deny) in paths.iter().zip(&denied) {
            if *deny {
                mock = mock.with_denied(*path);
            }
        }
        let facts = EnvironmentFacts { github_hosted: true, supported_platform: true };
        let input = PreStepInput {
            raw_level: &level.to_string(),
            facts,
            root: std::path::Path::new("/"),
            config_hash: None,
        };

        let summary = run_pre_step(
            &input,
            &mock,
            &mut MemoryStateChannel::new(),
            &mut RecordingOutput::new(),
            &mut ActivityLog::disabled(),
        );
        prop_assert!(summary.is_ok());

        let expected: Vec<PathBuf> = targets_for(level)
            .flat_map(|t| t.path_iter().map(std::path::Path::to_path_buf))
            .collect();
        prop_assert_eq!(mock.removal_attempts(), expected);
    }

    /// Removal happens only on hosted Linux; state is always persisted once.
    #[test]
    fn removal_requires_hosted_linux(level in arb_level(), facts in arb_facts()) {
        let mock = MockPlatform::new().with_samples([20, 25]);
        let mut state = MemoryStateChannel::new();
        let input = PreStepInput {
            raw_level: &level.to_string(),
            facts,
            root: std::path::Path::new("/"),
            config_hash: None,
        };

        let summary = run_pre_step(
            &input,
            &mock,
            &mut state,
            &mut RecordingOutput::new(),
            &mut ActivityLog::disabled(),
        ).unwrap();

        prop_assert_eq!(state.persist_calls(), 1);
        prop_assert_eq!(!mock.removal_attempts().is_empty(), facts.removal_allowed());
        let measured = mock.measure_count();
        if facts.supported_platform {
            prop_assert_eq!(measured, 2);
            let is_completed = matches!(summary.outcome, CleanupOutcome::Completed { .. });
            prop_assert!(is_completed);
        } else {
            prop_assert_eq!(measured, 0);
        }
    }

    /// Every (available, level) pair falls in exactly one band at the right edge.
    #[test]
    fn advice_bands_are_exhaustive(available in 0u64..10_000, level in arb_level()) {
        let band_ok = match advise(available, level) {
            Advice::LowSpace { .. } => available < 5,
            Advice::Moderate { .. } => (5..10).contains(&available),
            Advice::GoodBuffer { .. } => available >= 10,
        };
        prop_assert!(band_ok);
    }

    /// What the pre-step persists is exactly what the post-step reads.
    #[test]
    fn state_hand_off_round_trips(level in arb_level(), facts in arb_facts()) {
        let mut channel = MemoryStateChannel::new();
        let written = PersistedState::new(level, facts);
        written.persist(&mut channel).unwrap();
        prop_assert_eq!(PersistedState::read(&channel), written);
    }

    /// The post-step never fails and measures only on a supported platform.
    #[test]
    fn post_step_measures_only_when_supported(
        level in arb_level(),
        facts in arb_facts(),
        measurement_fails in any::<bool>(),
    ) {
        let mut channel = MemoryStateChannel::new();
        PersistedState::new(level, facts).persist(&mut channel).unwrap();
        let mock = if measurement_fails {
            MockPlatform::new().with_measurement_failure("statvfs: EIO")
        } else {
            MockPlatform::new().with_samples([7])
        };

        let summary = run_post_step(
            &channel,
            std::path::Path::new("/"),
            &mock,
            &mut RecordingOutput::new(),
            &mut ActivityLog::disabled(),
        );

        if facts.supported_platform {
            prop_assert_eq!(mock.measure_count(), 1);
            let expected_failure = measurement_fails;
            let failed = matches!(summary.outcome, ReportOutcome::MeasurementFailed { .. });
            prop_assert_eq!(failed, expected_failure);
        } else {
            prop_assert_eq!(mock.measure_count(), 0);
            let skipped = matches!(summary.outcome, ReportOutcome::UnsupportedPlatform);
            prop_assert!(skipped);
        }
    }
}
