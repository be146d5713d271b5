//! Post-job advice: classify remaining free space and suggest a level for the
//! next run.

use serde::Serialize;

use crate::core::level::CleanupLevel;
use crate::logger::jsonl::Severity;

/// Below this many GiB the run is considered short on space.
pub const LOW_SPACE_GIB: u64 = 5;
/// At or above this many GiB the level could probably be lowered.
pub const GOOD_BUFFER_GIB: u64 = 10;

/// Follow-up when the run ended short on space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "level", rename_all = "snake_case")]
pub enum LowSpaceHint {
    RaiseTo(CleanupLevel),
    /// Already at the top level; only other tools can help.
    UseAlternatives,
}

/// Follow-up when the run ended with room to spare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "level", rename_all = "snake_case")]
pub enum GoodBufferHint {
    LowerTo(CleanupLevel),
    /// Already at the bottom level.
    MayNotNeedAction,
}

/// Advisory band for the measured free space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "band", rename_all = "snake_case")]
pub enum Advice {
    LowSpace {
        available_gib: u64,
        suggestion: LowSpaceHint,
    },
    Moderate {
        available_gib: u64,
    },
    GoodBuffer {
        available_gib: u64,
        suggestion: GoodBufferHint,
    },
}

/// Classify `available_gib` for a run at `level`.
#[must_use]
pub fn advise(available_gib: u64, level: CleanupLevel) -> Advice {
    if available_gib < LOW_SPACE_GIB {
        let suggestion = level
            .next()
            .map_or(LowSpaceHint::UseAlternatives, LowSpaceHint::RaiseTo);
        Advice::LowSpace {
            available_gib,
            suggestion,
        }
    } else if available_gib < GOOD_BUFFER_GIB {
        Advice::Moderate { available_gib }
    } else {
        let suggestion = level
            .previous()
            .map_or(GoodBufferHint::MayNotNeedAction, GoodBufferHint::LowerTo);
        Advice::GoodBuffer {
            available_gib,
            suggestion,
        }
    }
}

impl Advice {
    /// Lines to print, in order.
    #[must_use]
    pub fn lines(&self) -> Vec<(Severity, String)> {
        match *self {
            Self::LowSpace { suggestion, .. } => {
                let mut lines = Vec::with_capacity(2);
                match suggestion {
                    LowSpaceHint::RaiseTo(next) => {
                        lines.push((
                            Severity::Warning,
                            format!("Warning: Less than {LOW_SPACE_GIB} GiB remaining."),
                        ));
                        lines.push((
                            Severity::Warning,
                            format!("   Consider increasing to level {next} for your next run."),
                        ));
                    }
                    LowSpaceHint::UseAlternatives => {
                        lines.push((
                            Severity::Warning,
                            format!(
                                "Warning: Less than {LOW_SPACE_GIB} GiB remaining and already at max level ({}).",
                                CleanupLevel::MAX
                            ),
                        ));
                        lines.push((
                            Severity::Warning,
                            "   Consider using alternative actions (see docs/alternatives.md)"
                                .to_string(),
                        ));
                    }
                }
                lines
            }
            Self::Moderate { available_gib } => vec![(
                Severity::Info,
                format!("Moderate buffer remaining ({available_gib} GiB)"),
            )],
            Self::GoodBuffer {
                available_gib,
                suggestion,
            } => {
                let hint = match suggestion {
                    GoodBufferHint::LowerTo(previous) => format!(
                        "   Consider reducing to level {previous} to speed up your workflow."
                    ),
                    GoodBufferHint::MayNotNeedAction => {
                        "   You may not need this action for your workflow.".to_string()
                    }
                };
                vec![
                    (
                        Severity::Info,
                        format!("Good buffer remaining ({available_gib} GiB)"),
                    ),
                    (
                        Severity::Info,
                        "Tip: You have plenty of space remaining.".to_string(),
                    ),
                    (Severity::Info, hint),
                ]
            }
        }
    }
}
