//! Benchmark parameter types.

use std::fmt;

use topoclust_core::DistanceFunction;

/// Parameters for a node selection benchmark run.
#[derive(Clone, Debug)]
pub struct SelectBenchParams {
    /// Total number of candidate nodes.
    pub node_count: usize,
    /// Number of nodes requested.
    pub number: usize,
    /// Linkage rule.
    pub function: DistanceFunction,
}

impl fmt::Display for SelectBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},k={},{}", self.node_count, self.number, self.function)
    }
}

/// Parameters for a host clustering benchmark run.
#[derive(Clone, Debug)]
pub struct ClusterizeBenchParams {
    /// Number of hosts to cluster.
    pub host_count: usize,
    /// Number of clusters requested.
    pub clusters: usize,
}

impl fmt::Display for ClusterizeBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hosts={},k={}", self.host_count, self.clusters)
    }
}
