//! Topology-aware node clustering.
//!
//! The crate selects sets of mutually close compute nodes for job placement.
//! A [`Topology`] answers host-to-host distances, the [`Hac`] engine groups
//! nodes by hierarchical agglomerative clustering, and the
//! [`TopologyManager`] dispatches [`TopologyDescriptor`] requests to the
//! matching selection policy.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod cluster;
mod descriptor;
mod distance;
mod error;
mod hac;
mod node;
mod selection;
mod topology;

#[cfg(test)]
mod test_utils;

pub use crate::{
    cluster::Cluster,
    descriptor::{BestProximity, ThresholdProximity, TopologyDescriptor},
    distance::{Distance, DistanceFunction, UNREACHABLE, UnknownDistanceFunction, is_reachable},
    error::{DescriptorError, DescriptorErrorCode, Result, TopologyError, TopologyErrorCode},
    hac::Hac,
    node::{Node, NodeSet},
    selection::{TopologyManager, TopologyManagerBuilder},
    topology::{HostTopology, Topology},
};
