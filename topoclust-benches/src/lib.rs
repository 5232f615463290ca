//! Benchmark support crate for topoclust.
//!
//! Generates synthetic rack topologies and parameter types used by the
//! Criterion benchmarks of the clustering engine and the selection
//! front-end.

pub mod error;
pub mod params;
pub mod topology;
