//! Selection handlers that place requests by host rather than by distance.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::{
    error::{Result, TopologyError},
    node::{Node, NodeSet},
};

/// Registered nodes per host.
pub(super) type HostIndex = BTreeMap<String, Vec<Node>>;

fn matched_keys(matched: &[Node]) -> HashSet<&str> {
    matched.iter().map(Node::key).collect()
}

fn is_free(nodes: &[Node], matched: &HashSet<&str>) -> bool {
    nodes.iter().all(|node| matched.contains(node.key()))
}

/// The first `number` nodes, with the rest of the host as extra nodes.
fn split_host(nodes: &[Node], number: usize) -> NodeSet {
    let (main, extra) = nodes.split_at(number.min(nodes.len()));
    NodeSet::with_extra_nodes(main.to_vec(), extra.to_vec())
}

/// Up to `number` matched nodes sharing one host.
///
/// When no host offers `number` matched nodes the request shrinks one node at
/// a time.
pub(super) fn single_host(index: &HostIndex, number: usize, matched: &[Node]) -> NodeSet {
    let keys = matched_keys(matched);
    let wanted = number.min(matched.len());
    for size in (1..=wanted).rev() {
        let found = index.values().filter(|nodes| nodes.len() >= size).find_map(|nodes| {
            let free: Vec<Node> = nodes
                .iter()
                .filter(|node| keys.contains(node.key()))
                .take(size)
                .cloned()
                .collect();
            (free.len() == size).then_some(free)
        });
        if let Some(nodes) = found {
            return NodeSet::new(nodes);
        }
    }
    NodeSet::default()
}

/// One fully free host holding at least `number` nodes, the smallest such
/// host preferred.
///
/// Nodes beyond `number` are returned as extra nodes. Without a large enough
/// free host the request shrinks one node at a time.
pub(super) fn single_host_exclusive(index: &HostIndex, number: usize, matched: &[Node]) -> NodeSet {
    let keys = matched_keys(matched);
    let mut hosts: Vec<&Vec<Node>> = index.values().collect();
    hosts.sort_by_key(|nodes| nodes.len());

    let mut wanted = number.min(matched.len());
    while wanted > 0 {
        let mut busy = HashSet::new();
        for (position, nodes) in hosts.iter().enumerate() {
            if nodes.len() < wanted {
                continue;
            }
            if is_free(nodes, &keys) {
                return split_host(nodes, wanted);
            }
            busy.insert(position);
        }
        hosts = hosts
            .into_iter()
            .enumerate()
            .filter(|(position, _)| !busy.contains(position))
            .map(|(_, nodes)| nodes)
            .collect();
        wanted -= 1;
    }
    NodeSet::default()
}

/// Fully free hosts covering `number` nodes with as few hosts and as little
/// surplus as possible.
///
/// Each step takes the host whose capacity is the largest not exceeding the
/// remaining need, or the largest host overall when every host exceeds it.
/// The surplus of the last host is returned as extra nodes.
pub(super) fn multiple_hosts_exclusive(
    index: &HostIndex,
    number: usize,
    matched: &[Node],
) -> Result<NodeSet> {
    if number == 0 || matched.is_empty() {
        return Ok(NodeSet::default());
    }

    let mut matched_per_host: BTreeMap<&str, usize> = BTreeMap::new();
    for node in matched {
        *matched_per_host.entry(node.host()).or_default() += 1;
    }

    let mut free: BTreeSet<(usize, &str)> = BTreeSet::new();
    for (host, count) in matched_per_host {
        let Some(nodes) = index.get(host) else {
            return Err(TopologyError::InconsistentState {
                host: host.to_owned(),
            });
        };
        if nodes.len() == count {
            free.insert((count, host));
        }
    }

    let mut selected = NodeSet::default();
    let mut remaining = number;
    while remaining > 0 {
        let Some((_, host)) = take_closest(&mut free, remaining) else {
            break;
        };
        let Some(nodes) = index.get(host) else {
            return Err(TopologyError::InconsistentState {
                host: host.to_owned(),
            });
        };
        if nodes.len() > remaining {
            selected.extend(split_host(nodes, remaining));
            break;
        }
        selected.extend(NodeSet::new(nodes.clone()));
        remaining -= nodes.len();
    }
    Ok(selected)
}

fn take_closest<'a>(free: &mut BTreeSet<(usize, &'a str)>, target: usize) -> Option<(usize, &'a str)> {
    let fitting = match target.checked_add(1) {
        Some(bound) => free.range(..(bound, "")).next_back(),
        None => free.last(),
    };
    let closest = fitting.or_else(|| free.last()).copied()?;
    free.remove(&closest);
    Some(closest)
}

/// One node on each of up to `number` fully free hosts, smallest hosts
/// first.
///
/// The remaining nodes of every chosen host are returned as extra nodes.
pub(super) fn different_hosts_exclusive(
    index: &HostIndex,
    number: usize,
    matched: &[Node],
) -> NodeSet {
    let keys = matched_keys(matched);
    let mut hosts: Vec<&Vec<Node>> = index
        .values()
        .filter(|nodes| !nodes.is_empty() && is_free(nodes, &keys))
        .collect();
    hosts.sort_by_key(|nodes| nodes.len());

    let mut selected = NodeSet::default();
    for nodes in hosts.into_iter().take(number) {
        selected.extend(split_host(nodes, 1));
    }
    selected
}
