//! Distance oracles over hosts and the nodes they run.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{distance::Distance, node::Node};

/// Source of pairwise distances between hosts.
///
/// Implementations answer `None` when no distance is known for a pair. A
/// known host is at distance `0` from itself.
///
/// # Examples
/// ```
/// use topoclust_core::{Node, Topology};
///
/// struct Flat;
///
/// impl Topology for Flat {
///     fn host_distance(&self, left: &str, right: &str) -> Option<i64> {
///         Some(if left == right { 0 } else { 10 })
///     }
/// }
///
/// let a = Node::new("alpha", "n1");
/// let b = Node::new("beta", "n2");
/// assert_eq!(Flat.node_distance(&a, &b), Some(10));
/// ```
pub trait Topology {
    /// Returns the distance between two hosts when known.
    fn host_distance(&self, left: &str, right: &str) -> Option<Distance>;

    /// Returns the distance between the hosts of two nodes when known.
    fn node_distance(&self, left: &Node, right: &Node) -> Option<Distance> {
        self.host_distance(left.host(), right.host())
    }
}

impl<T: Topology + ?Sized> Topology for &T {
    fn host_distance(&self, left: &str, right: &str) -> Option<Distance> {
        (**self).host_distance(left, right)
    }

    fn node_distance(&self, left: &Node, right: &Node) -> Option<Distance> {
        (**self).node_distance(left, right)
    }
}

/// In-memory host topology.
///
/// Each host stores the distances measured from it to the hosts that were
/// already known when it joined; lookups consult both directions, so one
/// measurement per pair is enough.
///
/// # Examples
/// ```
/// use topoclust_core::{HostTopology, Topology};
///
/// let mut topology = HostTopology::new();
/// topology.add_host("alpha", []);
/// topology.add_host("beta", [("alpha".to_owned(), 120)]);
/// assert_eq!(topology.host_distance("alpha", "beta"), Some(120));
/// assert_eq!(topology.host_distance("beta", "beta"), Some(0));
/// assert_eq!(topology.host_distance("alpha", "gamma"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostTopology {
    distances: HashMap<String, HashMap<String, Distance>>,
    hosts: BTreeSet<String>,
}

impl HostTopology {
    /// Creates an empty topology.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `host` with its distances to other hosts.
    ///
    /// Registering an already known host replaces its outgoing distances.
    pub fn add_host(
        &mut self,
        host: impl Into<String>,
        distances: impl IntoIterator<Item = (String, Distance)>,
    ) {
        let host = host.into();
        let row: HashMap<String, Distance> = distances
            .into_iter()
            .filter(|(other, _)| *other != host)
            .collect();
        self.hosts.insert(host.clone());
        self.distances.insert(host, row);
    }

    /// Forgets `host` and every distance recorded to or from it.
    ///
    /// Returns `false` when the host was unknown.
    pub fn remove_host(&mut self, host: &str) -> bool {
        if !self.hosts.remove(host) {
            return false;
        }
        self.distances.remove(host);
        for row in self.distances.values_mut() {
            row.remove(host);
        }
        true
    }

    /// Returns whether `host` is registered.
    #[must_use]
    pub fn knows_host(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }

    /// Returns the registered hosts in name order.
    #[must_use]
    pub fn hosts(&self) -> &BTreeSet<String> {
        &self.hosts
    }

    /// Returns whether both nodes run on the same known host.
    #[must_use]
    pub fn on_same_host(&self, left: &Node, right: &Node) -> bool {
        left.host() == right.host() && self.knows_host(left.host())
    }

    /// Returns every known distance from `host`, keyed by the other host.
    #[must_use]
    pub fn distances_from(&self, host: &str) -> BTreeMap<&str, Distance> {
        self.hosts
            .iter()
            .filter(|other| other.as_str() != host)
            .filter_map(|other| {
                self.host_distance(host, other)
                    .map(|distance| (other.as_str(), distance))
            })
            .collect()
    }
}

impl Topology for HostTopology {
    fn host_distance(&self, left: &str, right: &str) -> Option<Distance> {
        if left == right {
            return self.knows_host(left).then_some(0);
        }
        self.distances
            .get(left)
            .and_then(|row| row.get(right))
            .or_else(|| self.distances.get(right).and_then(|row| row.get(left)))
            .copied()
    }
}
