//! Test helpers shared by the topoclust crates.

pub mod proptest_profile;
pub mod tracing;
