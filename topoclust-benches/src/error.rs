//! Benchmark setup error type.

use topoclust_core::TopologyError;

use crate::topology::SyntheticError;

/// Errors that may occur while preparing a benchmark.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic topology generation failed.
    #[error("synthetic topology generation failed: {0}")]
    Synthetic(#[from] SyntheticError),
    /// Engine or selection setup failed.
    #[error("topology operation failed: {0}")]
    Topology(#[from] TopologyError),
}
