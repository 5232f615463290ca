//! Shared test utilities for `topoclust-core`.

use std::cell::Cell;

use proptest::test_runner::Config as ProptestConfig;
use topoclust_test_support::proptest_profile::ProptestRunProfile;

use crate::{
    distance::Distance,
    node::Node,
    topology::{HostTopology, Topology},
};

/// Builds a standard proptest configuration from the shared run profile.
#[must_use]
pub(crate) fn suite_proptest_config(default_cases: u32) -> ProptestConfig {
    let profile = ProptestRunProfile::load(default_cases);
    ProptestConfig {
        cases: profile.cases(),
        ..ProptestConfig::default()
    }
}

/// Returns the URL of the `index`-th node on `host`.
pub(crate) fn node_url(host: &str, index: usize) -> String {
    format!("pnp://{host}:64738/node-{index}")
}

/// Builds a topology from `(host, node_count)` pairs and explicit host
/// distances, returning the nodes in host order.
///
/// Hosts absent from `distances` have no known distance to each other.
pub(crate) fn layout(
    hosts: &[(&str, usize)],
    distances: &[(&str, &str, Distance)],
) -> (HostTopology, Vec<Node>) {
    let mut topology = HostTopology::new();
    let mut nodes = Vec::new();
    for (host, count) in hosts {
        let row = distances.iter().filter_map(|(left, right, distance)| {
            if left == host {
                Some(((*right).to_owned(), *distance))
            } else if right == host {
                Some(((*left).to_owned(), *distance))
            } else {
                None
            }
        });
        topology.add_host(*host, row);
        nodes.extend((0..*count).map(|index| Node::new(host, node_url(host, index))));
    }
    (topology, nodes)
}

/// One node per host, every pair of hosts at `distance`.
pub(crate) fn uniform(host_count: usize, distance: Distance) -> (HostTopology, Vec<Node>) {
    let names: Vec<String> = (0..host_count).map(|index| format!("h{index}")).collect();
    let mut topology = HostTopology::new();
    for (index, name) in names.iter().enumerate() {
        let row = names
            .iter()
            .take(index)
            .map(|other| (other.clone(), distance));
        topology.add_host(name.clone(), row);
    }
    let nodes = names
        .iter()
        .map(|name| Node::new(name, node_url(name, 0)))
        .collect();
    (topology, nodes)
}

/// [`Topology`] wrapper that counts host distance lookups.
pub(crate) struct CountingTopology<'a> {
    inner: &'a HostTopology,
    lookups: Cell<usize>,
}

impl<'a> CountingTopology<'a> {
    pub(crate) const fn new(inner: &'a HostTopology) -> Self {
        Self {
            inner,
            lookups: Cell::new(0),
        }
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.get()
    }
}

impl Topology for CountingTopology<'_> {
    fn host_distance(&self, left: &str, right: &str) -> Option<Distance> {
        self.lookups.set(self.lookups.get() + 1);
        self.inner.host_distance(left, right)
    }
}
