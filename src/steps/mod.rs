//! The two job steps: cleanup before the workload, report after it.

pub mod post;
pub mod pre;

#[cfg(test)]
mod test_properties;
