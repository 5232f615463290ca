//! Command implementations and argument parsing for the topoclust CLI.

use std::{
    collections::HashSet,
    io::{self, Write},
    path::PathBuf,
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use topoclust_core::{
    BestProximity, Cluster, DescriptorError, DistanceFunction, Hac, Node, ThresholdProximity,
    TopologyDescriptor, TopologyError, TopologyManager, TopologyManagerBuilder,
};
use tracing::{Span, field, info, instrument};

use super::topology_file::TopologyFile;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "topoclust", about = "Select close compute nodes from a host topology.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Select nodes for a placement request.
    Select(SelectCommand),
    /// Group hosts into a fixed number of clusters.
    Clusterize(ClusterizeCommand),
}

/// Placement policies accepted by `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DescriptorKind {
    /// Any nodes.
    Arbitrary,
    /// The closest nodes.
    BestProximity,
    /// The closest nodes within `--threshold`.
    ThresholdProximity,
    /// Nodes sharing one host.
    SingleHost,
    /// One fully reserved host.
    SingleHostExclusive,
    /// Several fully reserved hosts.
    MultipleHostsExclusive,
    /// One node on each of several fully reserved hosts.
    DifferentHostsExclusive,
}

/// Options accepted by the `select` command.
#[derive(Debug, Args, Clone)]
pub struct SelectCommand {
    /// Topology file (JSON).
    pub path: PathBuf,

    /// Number of nodes to select.
    #[arg(long)]
    pub number: usize,

    /// Placement policy.
    #[arg(long, value_enum, default_value_t = DescriptorKind::BestProximity)]
    pub descriptor: DescriptorKind,

    /// Largest admissible cluster distance for `threshold-proximity`.
    #[arg(long)]
    pub threshold: Option<i64>,

    /// Linkage function: `avg`, `max` or `min`.
    #[arg(long, default_value_t = DistanceFunction::Max)]
    pub function: DistanceFunction,

    /// URL of a node the selection must be close to. Repeatable.
    #[arg(long = "pivot", value_name = "URL")]
    pub pivots: Vec<String>,

    /// URL of a node that is already in use. Repeatable.
    #[arg(long = "busy", value_name = "URL")]
    pub busy: Vec<String>,

    /// Ignore measured distances.
    #[arg(long)]
    pub no_distances: bool,
}

/// Options accepted by the `clusterize` command.
#[derive(Debug, Args, Clone)]
pub struct ClusterizeCommand {
    /// Topology file (JSON).
    pub path: PathBuf,

    /// Number of clusters to form.
    #[arg(long)]
    pub clusters: usize,

    /// Linkage function: `avg`, `max` or `min`.
    #[arg(long, default_value_t = DistanceFunction::Max)]
    pub function: DistanceFunction,

    /// Largest admissible cluster distance.
    #[arg(long)]
    pub threshold: Option<i64>,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The topology file could not be opened.
    #[error("failed to open `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The topology file is not a valid document.
    #[error("failed to parse `{path}`: {source}")]
    Parse {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A node URL given on the command line is not in the topology file.
    #[error("node `{url}` is not listed in the topology file")]
    UnknownNode {
        /// The unresolved URL.
        url: String,
    },
    /// `threshold-proximity` was requested without `--threshold`.
    #[error("the threshold-proximity descriptor requires --threshold")]
    MissingThreshold,
    /// The requested descriptor is invalid.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    /// Selection or clustering failed.
    #[error(transparent)]
    Core(#[from] TopologyError),
}

/// Outcome of a CLI command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionSummary {
    /// Nodes picked by `select`.
    Selection {
        /// Descriptor name.
        descriptor: &'static str,
        /// Number of nodes requested.
        requested: usize,
        /// Selected nodes.
        nodes: Vec<Node>,
        /// Nodes reserved alongside the selection.
        extra_nodes: Vec<Node>,
    },
    /// Host clusters formed by `clusterize`.
    Clusters(Vec<Cluster<String>>),
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading the topology or running the command
/// fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use topoclust_cli::cli::{Cli, ClusterizeCommand, Command, ExecutionSummary, run_cli};
/// # use topoclust_core::DistanceFunction;
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// std::fs::write(
///     file.path(),
///     r#"{"hosts": [
///         {"name": "h1", "nodes": ["n1"]},
///         {"name": "h2", "nodes": ["n2"], "distances": {"h1": 5}}
///     ]}"#,
/// )?;
/// let cli = Cli {
///     command: Command::Clusterize(ClusterizeCommand {
///         path: file.path().to_path_buf(),
///         clusters: 1,
///         function: DistanceFunction::Max,
///         threshold: None,
///     }),
/// };
/// let ExecutionSummary::Clusters(clusters) = run_cli(cli)? else {
///     unreachable!("clusterize reports clusters");
/// };
/// assert_eq!(clusters[0].elements(), ["h1", "h2"]);
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Select(select) => {
            Span::current().record("command", field::display("select"));
            run_select(select)
        }
        Command::Clusterize(clusterize) => {
            Span::current().record("command", field::display("clusterize"));
            run_clusterize(clusterize)
        }
    }
}

#[instrument(
    name = "cli.select",
    err,
    skip(command),
    fields(path = %command.path.display(), number = command.number),
)]
pub(super) fn run_select(command: SelectCommand) -> Result<ExecutionSummary, CliError> {
    let file = TopologyFile::load(&command.path)?;
    let mut manager: TopologyManager = TopologyManagerBuilder::new()
        .with_distance_enabled(!command.no_distances)
        .build();
    file.register(&mut manager);

    let nodes = file.nodes();
    let pivot = resolve(&nodes, &command.pivots)?;
    let in_use = resolve(&nodes, &command.busy)?;
    let busy: HashSet<&str> = in_use.iter().map(Node::key).collect();
    let matched: Vec<Node> = nodes
        .iter()
        .filter(|node| !busy.contains(node.key()))
        .cloned()
        .collect();

    let descriptor = build_descriptor(&command, pivot)?;
    let selected = manager.select(&descriptor, command.number, &matched)?;
    let (nodes, extra_nodes) = selected.into_parts();
    info!(
        descriptor = descriptor.name(),
        selected = nodes.len(),
        extra = extra_nodes.len(),
        "selection completed"
    );
    Ok(ExecutionSummary::Selection {
        descriptor: descriptor.name(),
        requested: command.number,
        nodes,
        extra_nodes,
    })
}

#[instrument(
    name = "cli.clusterize",
    err,
    skip(command),
    fields(path = %command.path.display(), clusters = command.clusters),
)]
pub(super) fn run_clusterize(command: ClusterizeCommand) -> Result<ExecutionSummary, CliError> {
    let file = TopologyFile::load(&command.path)?;
    let mut manager = TopologyManager::default();
    file.register(&mut manager);

    let topology = manager.topology()?;
    let hac = Hac::new(
        &topology,
        &[],
        command.function,
        command.threshold.unwrap_or(i64::MAX),
    )?;
    let clusters = hac.clusterize(command.clusters, topology.hosts())?;
    info!(clusters = clusters.len(), "clusterize completed");
    Ok(ExecutionSummary::Clusters(clusters))
}

pub(super) fn build_descriptor(
    command: &SelectCommand,
    pivot: Vec<Node>,
) -> Result<TopologyDescriptor, CliError> {
    let descriptor = match command.descriptor {
        DescriptorKind::Arbitrary => TopologyDescriptor::Arbitrary,
        DescriptorKind::BestProximity => BestProximity::new()
            .with_function(command.function)
            .with_pivot(pivot)
            .into(),
        DescriptorKind::ThresholdProximity => {
            let threshold = command.threshold.ok_or(CliError::MissingThreshold)?;
            ThresholdProximity::new(threshold)?
                .with_function(command.function)
                .with_pivot(pivot)
                .into()
        }
        DescriptorKind::SingleHost => TopologyDescriptor::SingleHost,
        DescriptorKind::SingleHostExclusive => TopologyDescriptor::SingleHostExclusive,
        DescriptorKind::MultipleHostsExclusive => TopologyDescriptor::MultipleHostsExclusive,
        DescriptorKind::DifferentHostsExclusive => TopologyDescriptor::DifferentHostsExclusive,
    };
    Ok(descriptor)
}

fn resolve(nodes: &[Node], urls: &[String]) -> Result<Vec<Node>, CliError> {
    urls.iter()
        .map(|url| {
            nodes
                .iter()
                .find(|node| node.key() == url)
                .cloned()
                .ok_or_else(|| CliError::UnknownNode { url: url.clone() })
        })
        .collect()
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use topoclust_cli::cli::{ExecutionSummary, render_summary};
/// # use topoclust_core::Node;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = ExecutionSummary::Selection {
///     descriptor: "single_host",
///     requested: 1,
///     nodes: vec![Node::new("alpha", "pnp://alpha/0")],
///     extra_nodes: Vec::new(),
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// assert_eq!(
///     String::from_utf8(buffer)?,
///     "descriptor: single_host\nselected: 1 of 1\nalpha\tpnp://alpha/0\n",
/// );
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    match summary {
        ExecutionSummary::Selection {
            descriptor,
            requested,
            nodes,
            extra_nodes,
        } => {
            writeln!(writer, "descriptor: {descriptor}")?;
            writeln!(writer, "selected: {} of {requested}", nodes.len())?;
            for node in nodes {
                writeln!(writer, "{}\t{node}", node.host())?;
            }
            if !extra_nodes.is_empty() {
                writeln!(writer, "extra: {}", extra_nodes.len())?;
                for node in extra_nodes {
                    writeln!(writer, "{}\t{node}", node.host())?;
                }
            }
        }
        ExecutionSummary::Clusters(clusters) => {
            writeln!(writer, "clusters: {}", clusters.len())?;
            for (index, cluster) in clusters.iter().enumerate() {
                writeln!(writer, "{index}\t{}", cluster.elements().join(","))?;
            }
        }
    }
    Ok(())
}
