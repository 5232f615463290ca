//! Synthetic rack topologies.
//!
//! Hosts are grouped into racks. Hosts sharing a rack are 10 to 49 units
//! apart; hosts on different racks are 200 to 299 units apart.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use topoclust_core::{Distance, HostTopology, Node, TopologyManager};

/// Errors raised by invalid generator configurations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntheticError {
    /// A configuration dimension was zero.
    #[error("`{parameter}` must be greater than zero")]
    Zero {
        /// The offending parameter.
        parameter: &'static str,
    },
}

/// Shape of a synthetic rack topology.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticRackConfig {
    /// Number of racks.
    pub racks: usize,
    /// Hosts in each rack.
    pub hosts_per_rack: usize,
    /// Nodes on each host.
    pub nodes_per_host: usize,
    /// Seed for the distance jitter.
    pub seed: u64,
}

/// A generated topology with its nodes in host order.
#[derive(Clone, Debug)]
pub struct SyntheticRacks {
    topology: HostTopology,
    nodes: Vec<Node>,
    measured: Vec<(Node, Vec<(String, Distance)>)>,
}

impl SyntheticRacks {
    /// Generates the topology described by `config`.
    ///
    /// # Errors
    /// Returns [`SyntheticError::Zero`] when any dimension is zero.
    pub fn generate(config: &SyntheticRackConfig) -> Result<Self, SyntheticError> {
        for (parameter, value) in [
            ("racks", config.racks),
            ("hosts_per_rack", config.hosts_per_rack),
            ("nodes_per_host", config.nodes_per_host),
        ] {
            if value == 0 {
                return Err(SyntheticError::Zero { parameter });
            }
        }

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let mut placed: Vec<(usize, String)> = Vec::new();
        let mut topology = HostTopology::new();
        let mut nodes = Vec::new();
        let mut measured = Vec::new();

        for rack in 0..config.racks {
            for slot in 0..config.hosts_per_rack {
                let name = format!("rack{rack}-host{slot}");
                let row: Vec<(String, Distance)> = placed
                    .iter()
                    .map(|(other_rack, other)| {
                        let distance = if *other_rack == rack {
                            rng.gen_range(10..50)
                        } else {
                            200 + rng.gen_range(0..100)
                        };
                        (other.clone(), distance)
                    })
                    .collect();
                topology.add_host(name.clone(), row.iter().cloned());
                for index in 0..config.nodes_per_host {
                    let node = Node::new(&name, format!("pnp://{name}:64738/node-{index}"));
                    nodes.push(node.clone());
                    measured.push((node, row.clone()));
                }
                placed.push((rack, name));
            }
        }

        Ok(Self {
            topology,
            nodes,
            measured,
        })
    }

    /// The host topology.
    #[must_use]
    pub const fn topology(&self) -> &HostTopology {
        &self.topology
    }

    /// Every node, in host order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Builds a selection front-end with every node registered.
    #[must_use]
    pub fn manager(&self) -> TopologyManager {
        let mut manager = TopologyManager::default();
        for (node, row) in &self.measured {
            manager.add_node(node.clone(), row.iter().cloned());
        }
        manager
    }
}
