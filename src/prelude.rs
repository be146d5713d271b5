//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use more_disk_space::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{ErrorCategory, MdsError, Result};
pub use crate::core::level::CleanupLevel;

// Platform
pub use crate::platform::env::{EnvironmentFacts, detect_runner_image};
pub use crate::platform::pal::{LinuxPlatform, Platform};

// Policy
pub use crate::policy::executor::{RemovalPolicy, RemovalReport};
pub use crate::policy::targets::{REMOVAL_TARGETS, RemovalTarget, targets_for};

// State
pub use crate::state::channel::{FileStateChannel, GithubStateChannel, StateChannel};
pub use crate::state::persisted::PersistedState;

// Steps
pub use crate::report::advice::{Advice, GoodBufferHint, LowSpaceHint, advise};
pub use crate::steps::post::{PostStepSummary, run_post_step};
pub use crate::steps::pre::{PreStepInput, PreStepSummary, run_pre_step};

// Logging
pub use crate::logger::activity::ActivityLog;
pub use crate::logger::console::StepOutput;
