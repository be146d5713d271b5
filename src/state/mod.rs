//! Cross-step state hand-off.

pub mod channel;
pub mod persisted;
