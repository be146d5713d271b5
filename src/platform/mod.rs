//! Platform abstraction: runner detection, space probes, removal commands.

pub mod env;
pub mod pal;
