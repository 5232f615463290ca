//! Arena-backed cluster distance matrix.
//!
//! Clusters live in slots addressed by a stable [`ClusterId`]; a merge empties
//! the absorbed slot instead of re-keying anything, so an id never changes
//! meaning. Every unordered pair of live clusters holds exactly one distance
//! entry, stored under the `(low, high)` id pair.

use std::collections::BTreeMap;

use crate::{
    cluster::Cluster,
    distance::{Distance, DistanceFunction, UNREACHABLE, is_reachable},
};

/// Index of a cluster slot in the arena.
pub(crate) type ClusterId = usize;

const fn pair(left: ClusterId, right: ClusterId) -> (ClusterId, ClusterId) {
    if left < right {
        (left, right)
    } else {
        (right, left)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ClusterMatrix<T> {
    slots: Vec<Option<Cluster<T>>>,
    distances: BTreeMap<(ClusterId, ClusterId), Distance>,
    function: DistanceFunction,
    live: usize,
}

impl<T> ClusterMatrix<T> {
    pub(crate) const fn new(function: DistanceFunction) -> Self {
        Self {
            slots: Vec::new(),
            distances: BTreeMap::new(),
            function,
            live: 0,
        }
    }

    /// Adds a singleton cluster and records its distance to every live
    /// cluster. Pairs the oracle cannot answer are stored as unreachable.
    ///
    /// Returns the new cluster id and the number of distances the oracle
    /// answered.
    pub(crate) fn push_singleton(
        &mut self,
        key: &str,
        element: T,
        mut distance: impl FnMut(&T, &T) -> Option<Distance>,
    ) -> (ClusterId, usize) {
        let id = self.slots.len();
        let row: Vec<(ClusterId, Option<Distance>)> = self
            .live_clusters()
            .map(|(other, cluster)| {
                let known = cluster
                    .elements()
                    .first()
                    .and_then(|member| distance(&element, member));
                (other, known)
            })
            .collect();
        let established = row.iter().filter(|(_, known)| known.is_some()).count();
        for (other, known) in row {
            self.distances
                .insert(pair(other, id), known.unwrap_or(UNREACHABLE));
        }
        self.slots.push(Some(Cluster::singleton(key, element)));
        self.live += 1;
        (id, established)
    }

    pub(crate) const fn live_count(&self) -> usize {
        self.live
    }

    pub(crate) fn cluster(&self, id: ClusterId) -> Option<&Cluster<T>> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    pub(crate) fn len_of(&self, id: ClusterId) -> usize {
        self.cluster(id).map_or(0, Cluster::len)
    }

    pub(crate) fn live_clusters(&self) -> impl Iterator<Item = (ClusterId, &Cluster<T>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|cluster| (id, cluster)))
    }

    pub(crate) fn distance(&self, left: ClusterId, right: ClusterId) -> Option<Distance> {
        self.distances.get(&pair(left, right)).copied()
    }

    /// Returns `(absorbing, absorbed)` for a merge of `left` and `right`: the
    /// larger cluster absorbs, the lower id wins on equal sizes.
    pub(crate) fn absorption_order(
        &self,
        left: ClusterId,
        right: ClusterId,
    ) -> (ClusterId, ClusterId) {
        let left_len = self.len_of(left);
        let right_len = self.len_of(right);
        if right_len > left_len || (right_len == left_len && right < left) {
            (right, left)
        } else {
            (left, right)
        }
    }

    /// Merges two live clusters and returns the id of the surviving one.
    ///
    /// The distance from the survivor to every other live cluster `C` becomes
    /// `function(d(C, bigger), d(C, smaller))`; entries of the absorbed
    /// cluster are purged.
    pub(crate) fn merge(&mut self, left: ClusterId, right: ClusterId) -> ClusterId {
        let (bigger, smaller) = self.absorption_order(left, right);
        if bigger == smaller || self.cluster(bigger).is_none() {
            return bigger;
        }
        let Some(absorbed) = self.slots.get_mut(smaller).and_then(Option::take) else {
            return bigger;
        };
        self.live -= 1;
        self.distances.remove(&pair(bigger, smaller));

        let others: Vec<ClusterId> = self
            .live_clusters()
            .map(|(id, _)| id)
            .filter(|id| *id != bigger)
            .collect();
        for other in others {
            let to_bigger = self
                .distances
                .remove(&pair(other, bigger))
                .unwrap_or(UNREACHABLE);
            let to_smaller = self
                .distances
                .remove(&pair(other, smaller))
                .unwrap_or(UNREACHABLE);
            self.distances.insert(
                pair(other, bigger),
                self.function.distance(to_bigger, to_smaller),
            );
        }

        if let Some(Some(survivor)) = self.slots.get_mut(bigger) {
            survivor.absorb(absorbed.into_elements());
        }
        bigger
    }

    /// Finds the closest pair of live clusters within `threshold`.
    ///
    /// Unreachable pairs are never candidates. Ties resolve to the lowest
    /// `(low, high)` id pair.
    pub(crate) fn closest_pair(
        &self,
        threshold: Distance,
    ) -> Option<(ClusterId, ClusterId, Distance)> {
        let mut best: Option<(ClusterId, ClusterId, Distance)> = None;
        for (&(low, high), &distance) in &self.distances {
            if !is_reachable(distance) || distance > threshold {
                continue;
            }
            if best.is_none_or(|(_, _, current)| distance < current) {
                best = Some((low, high, distance));
            }
        }
        best
    }

    /// Finds the live cluster closest to `target` within `threshold`.
    ///
    /// Ties resolve to the lowest cluster id.
    pub(crate) fn closest_to(
        &self,
        target: ClusterId,
        threshold: Distance,
    ) -> Option<(ClusterId, Distance)> {
        let mut best: Option<(ClusterId, Distance)> = None;
        for (id, _) in self.live_clusters() {
            if id == target {
                continue;
            }
            let Some(distance) = self.distance(target, id) else {
                continue;
            };
            if !is_reachable(distance) || distance > threshold {
                continue;
            }
            if best.is_none_or(|(_, current)| distance < current) {
                best = Some((id, distance));
            }
        }
        best
    }

    /// Removes a live cluster from the arena, purging its distances.
    pub(crate) fn take(&mut self, id: ClusterId) -> Option<Cluster<T>> {
        let cluster = self.slots.get_mut(id).and_then(Option::take)?;
        self.live -= 1;
        self.distances.retain(|&(low, high), _| low != id && high != id);
        Some(cluster)
    }

    /// Consumes the matrix, returning the live clusters in id order.
    pub(crate) fn into_live_clusters(self) -> Vec<Cluster<T>> {
        self.slots.into_iter().flatten().collect()
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.distances.len()
    }

    #[cfg(test)]
    pub(crate) fn entries_reference_only_live_clusters(&self) -> bool {
        self.distances
            .keys()
            .all(|&(low, high)| self.cluster(low).is_some() && self.cluster(high).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    /// Points on a line; the distance is the absolute difference.
    fn line(points: &[i64], function: DistanceFunction) -> ClusterMatrix<i64> {
        let mut matrix = ClusterMatrix::new(function);
        for point in points {
            matrix.push_singleton(&point.to_string(), *point, |a, b| Some((a - b).abs()));
        }
        matrix
    }

    fn assert_one_entry_per_live_pair<T>(matrix: &ClusterMatrix<T>) {
        let live = matrix.live_count();
        assert_eq!(matrix.entry_count(), live * live.saturating_sub(1) / 2);
        assert!(matrix.entries_reference_only_live_clusters());
    }

    #[test]
    fn push_singleton_counts_answered_lookups() {
        let mut matrix = ClusterMatrix::new(DistanceFunction::Max);
        let (first, answered) = matrix.push_singleton("a", 0_i64, |_, _| None);
        assert_eq!((first, answered), (0, 0));
        let (second, answered) = matrix.push_singleton("b", 1, |_, _| None);
        assert_eq!((second, answered), (1, 0));
        assert_eq!(matrix.distance(0, 1), Some(UNREACHABLE));
        let (_, answered) = matrix.push_singleton("c", 2, |a, b| Some((a - b).abs()));
        assert_eq!(answered, 2);
        assert_eq!(matrix.distance(2, 0), Some(2));
        assert_eq!(matrix.distance(0, 2), Some(2));
    }

    #[rstest]
    #[case(DistanceFunction::Max, 9)]
    #[case(DistanceFunction::Min, 8)]
    #[case(DistanceFunction::Avg, 8)]
    fn merge_applies_the_linkage_rule(#[case] function: DistanceFunction, #[case] expected: i64) {
        let mut matrix = line(&[0, 1, 9], function);
        let survivor = matrix.merge(0, 1);
        assert_eq!(survivor, 0);
        assert_eq!(matrix.distance(survivor, 2), Some(expected));
        assert_eq!(matrix.len_of(survivor), 2);
        assert!(matrix.cluster(1).is_none());
        assert_one_entry_per_live_pair(&matrix);
    }

    #[test]
    fn larger_cluster_absorbs_the_smaller_one() {
        let mut matrix = line(&[0, 1, 2, 3], DistanceFunction::Max);
        let big = matrix.merge(2, 3);
        assert_eq!(big, 2);
        let survivor = matrix.merge(0, big);
        assert_eq!(survivor, 2);
        assert_eq!(matrix.cluster(2).map(Cluster::elements), Some(&[2, 3, 0][..]));
        assert_one_entry_per_live_pair(&matrix);
    }

    #[test]
    fn closest_pair_prefers_lowest_ids_on_ties() {
        let matrix = line(&[0, 5, 10, 15], DistanceFunction::Max);
        assert_eq!(matrix.closest_pair(i64::MAX), Some((0, 1, 5)));
        assert_eq!(matrix.closest_pair(4), None);
    }

    #[test]
    fn closest_to_skips_unreachable_and_distant_clusters() {
        let mut matrix = ClusterMatrix::new(DistanceFunction::Max);
        matrix.push_singleton("a", 0_i64, |_, _| None);
        matrix.push_singleton("b", 3, |_, _| None);
        matrix.push_singleton("c", 7, |a, b| Some((a - b).abs()));
        matrix.push_singleton("d", 8, |a, b| Some((a - b).abs()));
        assert_eq!(matrix.closest_to(0, i64::MAX), Some((2, 7)));
        assert_eq!(matrix.closest_to(0, 6), None);
        assert_eq!(matrix.closest_to(3, i64::MAX), Some((2, 1)));
    }

    #[test]
    fn min_linkage_turns_partially_unreachable_clusters_unreachable() {
        let mut matrix = ClusterMatrix::new(DistanceFunction::Min);
        matrix.push_singleton("a", 0_i64, |_, _| None);
        matrix.push_singleton("b", 1, |_, _| Some(1));
        // `c` reaches `b` but not `a`.
        matrix.push_singleton("c", 2, |_, other| (*other == 1).then_some(4));
        assert_eq!(matrix.distance(0, 2), Some(UNREACHABLE));
        let survivor = matrix.merge(0, 1);
        assert_eq!(matrix.distance(survivor, 2), Some(UNREACHABLE));
    }

    #[test]
    fn take_purges_the_cluster_and_its_distances() {
        let mut matrix = line(&[0, 1, 2, 10], DistanceFunction::Max);
        let pair_id = matrix.merge(0, 1);
        let taken = matrix.take(pair_id).map(Cluster::into_elements);
        assert_eq!(taken, Some(vec![0, 1]));
        assert_eq!(matrix.live_count(), 2);
        assert!(matrix.take(pair_id).is_none());
        assert_one_entry_per_live_pair(&matrix);
        let remaining: Vec<_> = matrix
            .into_live_clusters()
            .into_iter()
            .map(Cluster::into_elements)
            .collect();
        assert_eq!(remaining, vec![vec![2], vec![10]]);
    }
}
