//! Node selection front-end.
//!
//! [`TopologyManager`] owns the host topology and the index of nodes per
//! host, and dispatches each [`TopologyDescriptor`] to its selection
//! handler. Distance-based descriptors run the [`Hac`] engine; the host-based
//! descriptors work on the node index alone.

mod hosts;

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, instrument, warn};

use crate::{
    descriptor::TopologyDescriptor,
    distance::{Distance, DistanceFunction, UNREACHABLE},
    error::{Result, TopologyError},
    hac::Hac,
    node::{Node, NodeSet},
    topology::HostTopology,
};

/// Configures and constructs [`TopologyManager`] instances.
///
/// Topology and distances are both enabled by default.
///
/// # Examples
/// ```
/// use topoclust_core::TopologyManagerBuilder;
///
/// let manager = TopologyManagerBuilder::new()
///     .with_distance_enabled(false)
///     .build();
/// assert!(manager.topology_enabled());
/// assert!(!manager.distance_enabled());
/// ```
#[derive(Debug, Clone)]
pub struct TopologyManagerBuilder {
    topology_enabled: bool,
    distance_enabled: bool,
}

impl Default for TopologyManagerBuilder {
    fn default() -> Self {
        Self {
            topology_enabled: true,
            distance_enabled: true,
        }
    }
}

impl TopologyManagerBuilder {
    /// Creates a builder with topology and distances enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables topology tracking altogether.
    #[must_use]
    pub fn with_topology_enabled(mut self, enabled: bool) -> Self {
        self.topology_enabled = enabled;
        self
    }

    /// Enables or disables the use of measured host distances.
    ///
    /// With distances disabled every pair of hosts is recorded at
    /// [`i64::MAX`] and distance-based descriptors are refused.
    #[must_use]
    pub fn with_distance_enabled(mut self, enabled: bool) -> Self {
        self.distance_enabled = enabled;
        self
    }

    /// Constructs an empty manager.
    #[must_use]
    pub fn build(self) -> TopologyManager {
        TopologyManager {
            topology_enabled: self.topology_enabled,
            distance_enabled: self.distance_enabled,
            topology: HostTopology::new(),
            nodes_on_host: BTreeMap::new(),
        }
    }
}

/// Tracks registered nodes per host and selects node sets for descriptors.
///
/// # Examples
/// ```
/// use topoclust_core::{BestProximity, Node, TopologyManagerBuilder};
///
/// let mut manager = TopologyManagerBuilder::new().build();
/// let a = Node::new("alpha", "pnp://alpha/1");
/// let b = Node::new("beta", "pnp://beta/1");
/// let c = Node::new("gamma", "pnp://gamma/1");
/// manager.add_node(a.clone(), []);
/// manager.add_node(b.clone(), [("alpha".to_owned(), 5)]);
/// manager.add_node(c.clone(), [("alpha".to_owned(), 80), ("beta".to_owned(), 90)]);
///
/// let matched = [a.clone(), b.clone(), c];
/// let selected = manager.select(&BestProximity::new().into(), 2, &matched)?;
/// assert_eq!(selected.nodes(), [a, b]);
/// # Ok::<(), topoclust_core::TopologyError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TopologyManager {
    topology_enabled: bool,
    distance_enabled: bool,
    topology: HostTopology,
    nodes_on_host: BTreeMap<String, Vec<Node>>,
}

impl Default for TopologyManager {
    fn default() -> Self {
        TopologyManagerBuilder::default().build()
    }
}

impl TopologyManager {
    /// Returns whether topology tracking is enabled.
    #[must_use]
    pub const fn topology_enabled(&self) -> bool {
        self.topology_enabled
    }

    /// Returns whether measured distances are used.
    #[must_use]
    pub const fn distance_enabled(&self) -> bool {
        self.distance_enabled
    }

    /// Registers `node`.
    ///
    /// The first node of a host brings the host's distances to the hosts
    /// already known: `measured` supplies them, and known hosts missing from
    /// it are recorded as unreachable. Later nodes of the same host only join
    /// the node index. Does nothing when topology is disabled.
    pub fn add_node(&mut self, node: Node, measured: impl IntoIterator<Item = (String, Distance)>) {
        if !self.topology_enabled {
            return;
        }
        debug!(node = %node, "adding node to topology");

        if let Some(nodes) = self.nodes_on_host.get_mut(node.host()) {
            if !nodes.contains(&node) {
                nodes.push(node);
            }
            return;
        }

        let row: Vec<(String, Distance)> = if self.distance_enabled {
            let measured: HashMap<String, Distance> = measured.into_iter().collect();
            self.nodes_on_host
                .keys()
                .map(|host| (host.clone(), measured.get(host).copied().unwrap_or(UNREACHABLE)))
                .collect()
        } else {
            self.nodes_on_host
                .keys()
                .map(|host| (host.clone(), Distance::MAX))
                .collect()
        };
        let host = node.host().to_owned();
        self.topology.add_host(host.clone(), row);
        self.nodes_on_host.insert(host, vec![node]);
    }

    /// Unregisters `node`, dropping its host once the host has no nodes left.
    ///
    /// Does nothing when topology is disabled.
    pub fn remove_node(&mut self, node: &Node) {
        if !self.topology_enabled {
            return;
        }
        let Some(nodes) = self.nodes_on_host.get_mut(node.host()) else {
            warn!(node = %node, "topology info does not exist for node");
            return;
        };
        nodes.retain(|known| known != node);
        if nodes.is_empty() {
            self.nodes_on_host.remove(node.host());
            self.topology.remove_host(node.host());
        }
        debug!(node = %node, "node removed from topology");
    }

    /// Returns the nodes registered on `host`, in registration order.
    #[must_use]
    pub fn nodes_on_host(&self, host: &str) -> Option<&[Node]> {
        self.nodes_on_host.get(host).map(Vec::as_slice)
    }

    /// Returns a snapshot of the host topology.
    ///
    /// # Errors
    /// Returns [`TopologyError::TopologyDisabled`] when topology is disabled.
    pub fn topology(&self) -> Result<HostTopology> {
        if !self.topology_enabled {
            return Err(TopologyError::TopologyDisabled);
        }
        Ok(self.topology.clone())
    }

    /// Selects up to `number` nodes among `matched` for `descriptor`.
    ///
    /// `matched` holds the nodes that are free and satisfy the request's other
    /// criteria. Exclusive descriptors only consider hosts whose every
    /// registered node is matched.
    ///
    /// # Errors
    /// Returns [`TopologyError::TopologyDisabled`] or
    /// [`TopologyError::DistanceDisabled`] when the descriptor needs what the
    /// manager was built without, [`TopologyError::InconsistentState`] when a
    /// matched node's host is not registered for a multiple-hosts request,
    /// and propagates clustering errors for proximity descriptors.
    #[instrument(
        name = "selection.select",
        err,
        skip(self, descriptor, matched),
        fields(
            descriptor = descriptor.name(),
            matched = matched.len(),
            selected = tracing::field::Empty,
        ),
    )]
    pub fn select(
        &self,
        descriptor: &TopologyDescriptor,
        number: usize,
        matched: &[Node],
    ) -> Result<NodeSet> {
        if descriptor.is_topology_based() && !self.topology_enabled {
            return Err(TopologyError::TopologyDisabled);
        }
        if descriptor.requires_distances() && !self.distance_enabled {
            return Err(TopologyError::DistanceDisabled);
        }
        record_selection(descriptor.name());

        let selected = match descriptor {
            TopologyDescriptor::Arbitrary => {
                NodeSet::new(matched.iter().take(number).cloned().collect())
            }
            TopologyDescriptor::BestProximity(request) => self.closest(
                request.pivot(),
                request.function(),
                Distance::MAX,
                number,
                matched,
            )?,
            TopologyDescriptor::ThresholdProximity(request) => self.closest(
                request.pivot(),
                request.function(),
                request.threshold(),
                number,
                matched,
            )?,
            TopologyDescriptor::SingleHost => hosts::single_host(&self.nodes_on_host, number, matched),
            TopologyDescriptor::SingleHostExclusive => {
                hosts::single_host_exclusive(&self.nodes_on_host, number, matched)
            }
            TopologyDescriptor::MultipleHostsExclusive => {
                hosts::multiple_hosts_exclusive(&self.nodes_on_host, number, matched)?
            }
            TopologyDescriptor::DifferentHostsExclusive => {
                hosts::different_hosts_exclusive(&self.nodes_on_host, number, matched)
            }
        };
        tracing::Span::current().record("selected", selected.len());
        Ok(selected)
    }

    fn closest(
        &self,
        pivot: &[Node],
        function: DistanceFunction,
        threshold: Distance,
        number: usize,
        matched: &[Node],
    ) -> Result<NodeSet> {
        info!("running clustering algorithm to find the closest nodes");
        let hac = Hac::new(&self.topology, pivot, function, threshold)?;
        Ok(NodeSet::new(hac.select(number, matched)?))
    }
}

#[cfg(feature = "metrics")]
fn record_selection(descriptor: &'static str) {
    metrics::counter!("topology_selections_total", "descriptor" => descriptor).increment(1);
}

#[cfg(not(feature = "metrics"))]
const fn record_selection(_descriptor: &'static str) {}
