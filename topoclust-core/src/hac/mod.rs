//! Hierarchical agglomerative clustering over a network topology.
//!
//! [`Hac`] picks sets of mutually close nodes for job placement. It starts
//! from one singleton cluster per node and repeatedly merges clusters, using
//! the configured [`DistanceFunction`] as linkage rule to derive the distance
//! of a merged cluster from the distances of its parts. Two modes exist:
//!
//! - Pivot-oriented: the pivot nodes are merged into one target cluster
//!   first, then the cluster closest to the target joins it until enough
//!   nodes were gathered. Pivot nodes are not part of the answer.
//! - Floating: the globally closest pair of clusters merges until a cluster
//!   reaches the requested size. When a merge would overshoot, only the
//!   members of the absorbed cluster closest to the target are kept. When
//!   merging stops early, the cluster formed by the latest merge is the
//!   answer, even if an earlier cluster is larger.
//!
//! Merges are only admitted within the threshold, so fewer nodes than
//! requested may be returned. Ties between equally distant candidates
//! resolve to the cluster created first, which keeps results deterministic
//! for a given candidate order.

mod matrix;

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::{
    cluster::Cluster,
    distance::{Distance, DistanceFunction, UNREACHABLE, is_reachable},
    error::{Result, TopologyError},
    node::Node,
    topology::Topology,
};

use self::matrix::{ClusterId, ClusterMatrix};

/// Clustering engine bound to a topology, a pivot, a linkage rule and a merge
/// threshold.
///
/// # Examples
/// ```
/// use topoclust_core::{DistanceFunction, Hac, HostTopology, Node};
///
/// let mut topology = HostTopology::new();
/// topology.add_host("alpha", []);
/// topology.add_host("beta", [("alpha".to_owned(), 5)]);
/// topology.add_host("gamma", [("alpha".to_owned(), 50), ("beta".to_owned(), 50)]);
///
/// let nodes = [
///     Node::new("alpha", "a"),
///     Node::new("beta", "b"),
///     Node::new("gamma", "c"),
/// ];
/// let hac = Hac::new(&topology, &[], DistanceFunction::Max, i64::MAX)?;
/// let selected = hac.select(2, &nodes)?;
/// assert_eq!(selected, vec![Node::new("alpha", "a"), Node::new("beta", "b")]);
/// # Ok::<(), topoclust_core::TopologyError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Hac<'a, T: ?Sized> {
    topology: &'a T,
    pivot: Vec<Node>,
    function: DistanceFunction,
    threshold: Distance,
}

impl<'a, T: Topology + ?Sized> Hac<'a, T> {
    /// Creates an engine clustering around `pivot` (floating when empty).
    ///
    /// Duplicate pivot nodes are ignored.
    ///
    /// # Errors
    /// Returns [`TopologyError::MissingPivotDistance`] when two pivot nodes
    /// have no known distance between them.
    pub fn new(
        topology: &'a T,
        pivot: &[Node],
        function: DistanceFunction,
        threshold: Distance,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let pivot: Vec<Node> = pivot
            .iter()
            .filter(|node| seen.insert(node.key()))
            .cloned()
            .collect();

        for (index, left) in pivot.iter().enumerate() {
            for right in pivot.iter().skip(index + 1) {
                if topology.node_distance(left, right).is_none() {
                    return Err(TopologyError::MissingPivotDistance {
                        left: left.key().to_owned(),
                        right: right.key().to_owned(),
                    });
                }
            }
        }

        Ok(Self {
            topology,
            pivot,
            function,
            threshold,
        })
    }

    /// Returns the deduplicated pivot nodes.
    #[must_use]
    pub fn pivot(&self) -> &[Node] {
        &self.pivot
    }

    /// Returns the linkage rule.
    #[must_use]
    pub const fn function(&self) -> DistanceFunction {
        self.function
    }

    /// Returns the merge threshold.
    #[must_use]
    pub const fn threshold(&self) -> Distance {
        self.threshold
    }

    /// Selects at most `number` mutually close nodes out of `from`.
    ///
    /// Pivot nodes take part in the clustering but are never returned. The
    /// result holds fewer than `number` nodes when not enough candidates are
    /// within the threshold.
    ///
    /// # Errors
    /// Returns [`TopologyError::TopologyUnavailable`] when `from` is not
    /// empty and the topology knows none of the candidates.
    #[instrument(
        name = "hac.select",
        err,
        skip(self, from),
        fields(
            candidates = from.len(),
            pivot = self.pivot.len(),
            function = %self.function,
            threshold = self.threshold,
            selected = tracing::field::Empty,
        ),
    )]
    pub fn select(&self, number: usize, from: &[Node]) -> Result<Vec<Node>> {
        if number == 0 {
            return Ok(Vec::new());
        }

        let (matrix, pivot_ids) = self.build_matrix(from)?;
        let selected = if pivot_ids.is_empty() {
            self.select_floating(matrix, number)
        } else {
            self.select_around_pivot(matrix, pivot_ids, number)
        };
        tracing::Span::current().record("selected", selected.len());
        Ok(selected)
    }

    /// Groups `hosts` into at most `number_of_clusters` clusters.
    ///
    /// Clusters merge closest pair first until `number_of_clusters` remain
    /// or no pair is within the threshold. The pivot is not used. Clusters
    /// are keyed by the first host they were created from.
    ///
    /// # Errors
    /// Returns [`TopologyError::InvalidClusterCount`] when
    /// `number_of_clusters` is zero.
    ///
    /// # Examples
    /// ```
    /// use topoclust_core::{DistanceFunction, Hac, HostTopology};
    ///
    /// let mut topology = HostTopology::new();
    /// topology.add_host("h1", []);
    /// topology.add_host("h2", [("h1".to_owned(), 1)]);
    /// topology.add_host("h3", [("h1".to_owned(), 90), ("h2".to_owned(), 80)]);
    ///
    /// let hac = Hac::new(&topology, &[], DistanceFunction::Max, i64::MAX)?;
    /// let clusters = hac.clusterize(2, ["h1", "h2", "h3"])?;
    /// assert_eq!(clusters.len(), 2);
    /// assert_eq!(clusters[0].elements(), ["h1", "h2"]);
    /// # Ok::<(), topoclust_core::TopologyError>(())
    /// ```
    #[instrument(name = "hac.clusterize", err, skip(self, hosts), fields(clusters = tracing::field::Empty))]
    pub fn clusterize<I, S>(&self, number_of_clusters: usize, hosts: I) -> Result<Vec<Cluster<String>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if number_of_clusters == 0 {
            return Err(TopologyError::InvalidClusterCount {
                got: number_of_clusters,
            });
        }

        let mut matrix = ClusterMatrix::new(self.function);
        let mut seen = HashSet::new();
        for host in hosts {
            let host = host.as_ref();
            if !seen.insert(host.to_owned()) {
                continue;
            }
            matrix.push_singleton(host, host.to_owned(), |left, right| {
                self.topology.host_distance(left, right)
            });
        }

        while matrix.live_count() > number_of_clusters {
            let Some((left, right, distance)) = matrix.closest_pair(self.threshold) else {
                break;
            };
            let survivor = matrix.merge(left, right);
            record_merge();
            debug!(
                survivor,
                distance,
                remaining = matrix.live_count(),
                "merged host clusters"
            );
        }

        let clusters = matrix.into_live_clusters();
        tracing::Span::current().record("clusters", clusters.len());
        Ok(clusters)
    }

    fn build_matrix(&self, from: &[Node]) -> Result<(ClusterMatrix<Node>, Vec<ClusterId>)> {
        let mut matrix = ClusterMatrix::new(self.function);
        let mut ids: HashMap<&str, ClusterId> = HashMap::new();
        let mut established = 0;

        for node in from.iter().chain(&self.pivot) {
            if ids.contains_key(node.key()) {
                continue;
            }
            let (id, answered) = matrix.push_singleton(node.key(), node.clone(), |left, right| {
                self.topology.node_distance(left, right)
            });
            established += answered;
            ids.insert(node.key(), id);
        }

        if !from.is_empty()
            && established == 0
            && !from
                .iter()
                .any(|node| self.topology.node_distance(node, node).is_some())
        {
            return Err(TopologyError::TopologyUnavailable {
                candidates: from.len(),
            });
        }

        let pivot_ids = self
            .pivot
            .iter()
            .filter_map(|node| ids.get(node.key()).copied())
            .collect();
        Ok((matrix, pivot_ids))
    }

    fn select_around_pivot(
        &self,
        mut matrix: ClusterMatrix<Node>,
        pivot_ids: Vec<ClusterId>,
        number: usize,
    ) -> Vec<Node> {
        let goal = number.saturating_add(pivot_ids.len());
        let mut ids = pivot_ids.into_iter();
        let Some(mut target) = ids.next() else {
            return Vec::new();
        };
        for id in ids {
            target = matrix.merge(target, id);
        }

        while matrix.len_of(target) < goal {
            let Some((closest, distance)) = matrix.closest_to(target, self.threshold) else {
                break;
            };
            target = matrix.merge(target, closest);
            record_merge();
            debug!(
                distance,
                size = matrix.len_of(target),
                "merged closest cluster into pivot target"
            );
        }

        let Some(mut cluster) = matrix.take(target) else {
            return Vec::new();
        };
        let pivot_keys: HashSet<&str> = self.pivot.iter().map(Node::key).collect();
        cluster.retain(|node| !pivot_keys.contains(node.key()));
        cluster.into_elements()
    }

    /// Grows clusters closest pair first. The target is the cluster formed
    /// by the latest merge; before any merge it is the first candidate.
    fn select_floating(&self, mut matrix: ClusterMatrix<Node>, number: usize) -> Vec<Node> {
        let mut target = matrix.live_clusters().next().map(|(id, _)| id);
        while matrix.live_count() > 1 {
            let Some((left, right, distance)) = matrix.closest_pair(self.threshold) else {
                break;
            };
            let merged = matrix.len_of(left) + matrix.len_of(right);
            if merged > number {
                return self.fill_from_overflow(&mut matrix, left, right, number);
            }

            let survivor = matrix.merge(left, right);
            record_merge();
            debug!(distance, size = merged, "merged closest clusters");
            target = Some(survivor);
            if merged == number {
                break;
            }
        }

        let Some(chosen) = target else {
            return Vec::new();
        };
        let mut nodes = matrix
            .take(chosen)
            .map(Cluster::into_elements)
            .unwrap_or_default();
        nodes.truncate(number);
        nodes
    }

    /// Completes the larger of two clusters with the members of the smaller
    /// one that are closest to it, up to `number` nodes.
    fn fill_from_overflow(
        &self,
        matrix: &mut ClusterMatrix<Node>,
        left: ClusterId,
        right: ClusterId,
        number: usize,
    ) -> Vec<Node> {
        let (bigger, smaller) = matrix.absorption_order(left, right);
        let mut target = matrix
            .take(bigger)
            .map(Cluster::into_elements)
            .unwrap_or_default();
        let candidates = matrix
            .take(smaller)
            .map(Cluster::into_elements)
            .unwrap_or_default();

        let ranked = self.rank_by_proximity(candidates, &target);

        let missing = number.saturating_sub(target.len());
        debug!(
            kept = target.len(),
            added = missing.min(ranked.len()),
            "merge overshoots requested size, keeping closest members"
        );
        target.extend(ranked.into_iter().take(missing));
        target.truncate(number);
        target
    }

    /// Orders `candidates` by aggregate distance to `group`, closest first.
    /// Unreachable aggregates sort after every reachable one.
    fn rank_by_proximity(&self, candidates: Vec<Node>, group: &[Node]) -> Vec<Node> {
        let mut ranked: Vec<(Distance, Node)> = candidates
            .into_iter()
            .map(|node| (self.distance_to_group(&node, group), node))
            .collect();
        // Stable sort keeps accumulation order among equally close nodes.
        ranked.sort_by_key(|(distance, _)| (!is_reachable(*distance), *distance));
        ranked.into_iter().map(|(_, node)| node).collect()
    }

    /// Folds the distances from `node` to every member of `group` through
    /// the linkage rule, starting from zero.
    fn distance_to_group(&self, node: &Node, group: &[Node]) -> Distance {
        group.iter().fold(0, |aggregate, member| {
            let distance = self
                .topology
                .node_distance(node, member)
                .unwrap_or(UNREACHABLE);
            self.function.distance(aggregate, distance)
        })
    }
}

#[cfg(feature = "metrics")]
fn record_merge() {
    metrics::counter!("hac_merges_total").increment(1);
}

#[cfg(not(feature = "metrics"))]
const fn record_merge() {}

#[cfg(test)]
mod tests;
