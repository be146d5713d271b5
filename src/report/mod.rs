//! Free-space reporting and tuning advice.

pub mod advice;
