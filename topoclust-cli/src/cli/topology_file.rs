//! JSON topology files.

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use serde::Deserialize;
use topoclust_core::{Distance, Node, TopologyManager};
use tracing::{Span, field, instrument, warn};

use super::CliError;

/// Hosts, their nodes and measured distances, as read from disk.
///
/// ```json
/// { "hosts": [
///     { "name": "alpha", "nodes": ["pnp://alpha/0"] },
///     { "name": "beta", "nodes": ["pnp://beta/0"], "distances": { "alpha": 120 } }
/// ] }
/// ```
///
/// A distance may be listed on either host of the pair.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TopologyFile {
    /// Hosts in registration order.
    pub hosts: Vec<HostEntry>,
}

/// One host of a [`TopologyFile`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HostEntry {
    /// Host name.
    pub name: String,
    /// URLs of the nodes running on the host.
    pub nodes: Vec<String>,
    /// Measured distances to other hosts, keyed by host name.
    #[serde(default)]
    pub distances: BTreeMap<String, Distance>,
}

impl TopologyFile {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    /// Returns [`CliError::Io`] when the file cannot be opened and
    /// [`CliError::Parse`] when it is not a valid topology document.
    #[instrument(name = "cli.load_topology", err, fields(hosts = field::Empty))]
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let file = File::open(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Span::current().record("hosts", parsed.hosts.len());
        Ok(parsed)
    }

    /// Every node of the file, in host order.
    #[must_use]
    pub fn nodes(&self) -> Vec<Node> {
        self.hosts
            .iter()
            .flat_map(|host| host.nodes.iter().map(|url| Node::new(&host.name, url)))
            .collect()
    }

    /// Distance between two hosts as listed on either of them.
    #[must_use]
    pub fn distance(&self, left: &str, right: &str) -> Option<Distance> {
        let listed = |from: &str, to: &str| {
            self.hosts
                .iter()
                .find(|host| host.name == from)
                .and_then(|host| host.distances.get(to).copied())
        };
        listed(left, right).or_else(|| listed(right, left))
    }

    /// Registers every node with `manager`, hosts in file order.
    ///
    /// Each host reports its distances to the hosts registered before it.
    /// Hosts without nodes cannot be registered and are skipped.
    pub fn register(&self, manager: &mut TopologyManager) {
        for (position, host) in self.hosts.iter().enumerate() {
            if host.nodes.is_empty() {
                warn!(host = %host.name, "host lists no nodes; skipping");
                continue;
            }
            let measured: Vec<(String, Distance)> = self
                .hosts
                .iter()
                .take(position)
                .filter_map(|earlier| {
                    self.distance(&host.name, &earlier.name)
                        .map(|distance| (earlier.name.clone(), distance))
                })
                .collect();
            for url in &host.nodes {
                manager.add_node(Node::new(&host.name, url), measured.iter().cloned());
            }
        }
    }
}
