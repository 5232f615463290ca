//! Command-line interface for topology-aware node selection.
//!
//! `select` loads a topology file and picks nodes for a descriptor;
//! `clusterize` groups the file's hosts into a fixed number of clusters.

mod commands;
mod topology_file;

pub use commands::{
    Cli, CliError, ClusterizeCommand, Command, DescriptorKind, ExecutionSummary, SelectCommand,
    render_summary, run_cli,
};
pub use topology_file::{HostEntry, TopologyFile};
