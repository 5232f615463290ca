//! Unit and property tests for the clustering engine.

use std::collections::HashSet;

use proptest::prelude::*;
use rstest::rstest;
use topoclust_test_support::tracing::CaptureLayer;
use tracing_subscriber::layer::SubscriberExt;

use crate::{
    DistanceFunction, Hac, HostTopology, Node, TopologyError,
    test_utils::{CountingTopology, layout, suite_proptest_config, uniform},
};

/// Six nodes on `local`, one on `neighbor`, two on `distant`.
fn three_sites() -> (HostTopology, Vec<Node>) {
    layout(
        &[("local", 6), ("neighbor", 1), ("distant", 2)],
        &[
            ("local", "neighbor", 10),
            ("local", "distant", 100),
            ("neighbor", "distant", 95),
        ],
    )
}

fn hosts_of(nodes: &[Node]) -> Vec<&str> {
    nodes.iter().map(Node::host).collect()
}

fn floating(topology: &HostTopology, threshold: i64) -> Hac<'_, HostTopology> {
    Hac::new(topology, &[], DistanceFunction::Max, threshold).expect("empty pivot is valid")
}

#[test]
fn uniform_topology_returns_exactly_the_requested_count() {
    let (topology, nodes) = uniform(5, 10);
    let selected = floating(&topology, i64::MAX)
        .select(3, &nodes)
        .expect("selection must succeed");
    assert_eq!(selected.len(), 3);
}

#[test]
fn pivot_pulls_in_the_closest_node() {
    let (topology, nodes) = layout(
        &[("a", 1), ("b", 1), ("c", 1)],
        &[("a", "b", 5), ("a", "c", 50), ("b", "c", 60)],
    );
    let pivot = [nodes[0].clone()];
    let hac = Hac::new(&topology, &pivot, DistanceFunction::Max, 100).expect("valid pivot");
    let selected = hac.select(1, &nodes[1..]).expect("selection must succeed");
    assert_eq!(selected, vec![nodes[1].clone()]);
}

#[test]
fn pivot_nodes_are_never_returned() {
    let (topology, nodes) = three_sites();
    let pivot = [nodes[0].clone()];
    let hac = Hac::new(&topology, &pivot, DistanceFunction::Max, i64::MAX).expect("valid pivot");
    let selected = hac.select(6, &nodes).expect("selection must succeed");
    assert_eq!(selected.len(), 6);
    assert!(!selected.contains(&nodes[0]));
    assert!(!hosts_of(&selected).contains(&"distant"));
}

#[test]
fn pivot_growth_respects_the_threshold() {
    let (topology, nodes) = three_sites();
    let pivot = [nodes[0].clone()];
    let hac = Hac::new(&topology, &pivot, DistanceFunction::Max, 0).expect("valid pivot");
    let selected = hac.select(100, &nodes).expect("selection must succeed");
    assert_eq!(selected.len(), 5);
    assert!(hosts_of(&selected).iter().all(|host| *host == "local"));
}

#[test]
fn multiple_pivots_are_merged_before_growth() {
    let (topology, nodes) = layout(
        &[("a", 1), ("b", 1), ("c", 1), ("d", 1)],
        &[
            ("a", "b", 20),
            ("a", "c", 30),
            ("b", "c", 1),
            ("a", "d", 2),
            ("b", "d", 90),
            ("c", "d", 90),
        ],
    );
    let pivot = [nodes[0].clone(), nodes[1].clone()];
    let hac = Hac::new(&topology, &pivot, DistanceFunction::Max, i64::MAX).expect("valid pivot");
    // Complete linkage: d({a, b}, c) = 30 while d({a, b}, d) = 90.
    let selected = hac.select(1, &nodes).expect("selection must succeed");
    assert_eq!(selected, vec![nodes[2].clone()]);
}

#[test]
fn missing_pivot_distance_is_rejected() {
    let (topology, nodes) = layout(&[("a", 1), ("b", 1)], &[]);
    let err = Hac::new(&topology, &nodes, DistanceFunction::Max, i64::MAX)
        .expect_err("pivot nodes without a distance must be rejected");
    assert!(matches!(err, TopologyError::MissingPivotDistance { .. }));
}

#[test]
fn pivot_validation_checks_each_pair_once() {
    let (topology, nodes) = uniform(4, 3);
    let counting = CountingTopology::new(&topology);
    Hac::new(&counting, &nodes, DistanceFunction::Max, i64::MAX).expect("valid pivot");
    assert_eq!(counting.lookups(), 6);
}

#[test]
fn unknown_candidates_report_unavailable_topology() {
    let topology = HostTopology::new();
    let nodes = [Node::new("a", "n1"), Node::new("b", "n2")];
    let err = floating(&topology, i64::MAX)
        .select(1, &nodes)
        .expect_err("topology without the candidates must fail");
    assert_eq!(err, TopologyError::TopologyUnavailable { candidates: 2 });
}

#[test]
fn single_known_candidate_is_selected() {
    let (topology, nodes) = uniform(1, 0);
    let selected = floating(&topology, i64::MAX)
        .select(4, &nodes)
        .expect("a known node is a valid candidate");
    assert_eq!(selected, nodes);
}

#[rstest]
#[case::no_candidates(3, 0)]
#[case::zero_requested(0, 5)]
fn degenerate_requests_return_nothing(#[case] number: usize, #[case] candidates: usize) {
    let (topology, nodes) = uniform(5, 1);
    let selected = floating(&topology, i64::MAX)
        .select(number, &nodes[..candidates])
        .expect("degenerate requests must succeed");
    assert!(selected.is_empty());
}

// Co-located nodes are 0 apart, so the two distant nodes form the last merge
// whenever the neighbor is out of reach.
#[rstest]
#[case::below_neighbor(9, 2, &["distant"])]
#[case::at_neighbor(10, 7, &["local", "neighbor"])]
#[case::below_distant(99, 7, &["local", "neighbor"])]
#[case::at_distant(100, 9, &["local", "neighbor", "distant"])]
fn threshold_bounds_the_selection(
    #[case] threshold: i64,
    #[case] expected: usize,
    #[case] allowed: &[&str],
) {
    let (topology, nodes) = three_sites();
    let selected = floating(&topology, threshold)
        .select(100, &nodes)
        .expect("selection must succeed");
    assert_eq!(selected.len(), expected);
    assert!(hosts_of(&selected).iter().all(|host| allowed.contains(host)));
}

#[test]
fn floating_selection_returns_the_latest_merge() {
    let (topology, nodes) = layout(
        &[("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1)],
        &[
            ("a", "b", 1),
            ("a", "c", 2),
            ("b", "c", 2),
            ("d", "e", 5),
            ("a", "d", 100),
            ("a", "e", 100),
            ("b", "d", 100),
            ("b", "e", 100),
            ("c", "d", 100),
            ("c", "e", 100),
        ],
    );
    // {a, b, c} forms first; {d, e} is the last merge within the threshold.
    let selected = floating(&topology, 10)
        .select(4, &nodes)
        .expect("selection must succeed");
    assert_eq!(hosts_of(&selected), ["d", "e"]);
}

#[test]
fn floating_selection_without_any_merge_returns_the_first_candidate() {
    let (topology, nodes) = uniform(3, 10);
    let selected = floating(&topology, 5)
        .select(2, &nodes)
        .expect("selection must succeed");
    assert_eq!(selected, nodes[..1].to_vec());
}

#[rstest]
#[case::min(DistanceFunction::Min)]
#[case::max(DistanceFunction::Max)]
#[case::avg(DistanceFunction::Avg)]
fn unreachable_candidates_rank_after_reachable_ones(#[case] function: DistanceFunction) {
    let (topology, nodes) = layout(
        &[("group", 1), ("far", 1), ("near", 1)],
        &[("group", "near", 5)],
    );
    let hac = Hac::new(&topology, &[], function, i64::MAX).expect("empty pivot is valid");
    let ranked = hac.rank_by_proximity(vec![nodes[1].clone(), nodes[2].clone()], &nodes[..1]);
    assert_eq!(hosts_of(&ranked), ["near", "far"]);
}

#[rstest]
#[case(6, &["local"])]
#[case(7, &["local", "neighbor"])]
#[case(9, &["local", "neighbor", "distant"])]
fn best_proximity_prefers_close_hosts(#[case] number: usize, #[case] allowed: &[&str]) {
    let (topology, nodes) = three_sites();
    let selected = floating(&topology, i64::MAX)
        .select(number, &nodes)
        .expect("selection must succeed");
    assert_eq!(selected.len(), number);
    assert!(hosts_of(&selected).iter().all(|host| allowed.contains(host)));
}

#[test]
fn overflowing_merge_keeps_the_closest_members() {
    let (topology, nodes) = layout(
        &[("a", 2), ("b", 1), ("c", 1)],
        &[("a", "b", 10), ("a", "c", 12), ("b", "c", 2)],
    );
    let selected = floating(&topology, i64::MAX)
        .select(3, &nodes)
        .expect("selection must succeed");
    assert_eq!(selected, nodes[..3].to_vec());
}

#[test]
fn single_node_request_never_overshoots() {
    let (topology, nodes) = three_sites();
    let selected = floating(&topology, i64::MAX)
        .select(1, &nodes)
        .expect("selection must succeed");
    assert_eq!(selected.len(), 1);
}

#[test]
fn repeated_selection_is_deterministic() {
    let (topology, nodes) = three_sites();
    let first = floating(&topology, i64::MAX).select(4, &nodes);
    let second = floating(&topology, i64::MAX).select(4, &nodes);
    assert_eq!(first, second);
}

#[test]
fn clusterize_keeps_distant_host_apart() {
    let (topology, _) = layout(
        &[("h1", 1), ("h2", 1), ("h3", 1)],
        &[("h1", "h2", 1), ("h1", "h3", 90), ("h2", "h3", 80)],
    );
    let clusters = floating(&topology, i64::MAX)
        .clusterize(2, ["h1", "h2", "h3"])
        .expect("clusterize must succeed");
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].elements(), ["h1", "h2"]);
    assert_eq!(clusters[1].elements(), ["h3"]);
}

#[test]
fn clusterize_rejects_zero_clusters() {
    let (topology, _) = uniform(3, 1);
    let err = floating(&topology, i64::MAX)
        .clusterize(0, ["h0", "h1"])
        .expect_err("zero clusters must be rejected");
    assert_eq!(err, TopologyError::InvalidClusterCount { got: 0 });
}

#[test]
fn clusterize_stops_at_the_threshold() {
    let (topology, _) = uniform(4, 10);
    let clusters = floating(&topology, 9)
        .clusterize(1, ["h0", "h1", "h2", "h3", "h0"])
        .expect("clusterize must succeed");
    assert_eq!(clusters.len(), 4);
}

#[test]
fn select_records_a_span() {
    let layer = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let (topology, nodes) = uniform(5, 10);
    tracing::subscriber::with_default(subscriber, || {
        floating(&topology, i64::MAX)
            .select(3, &nodes)
            .expect("selection must succeed");
    });

    let spans = layer.spans();
    let span = spans
        .iter()
        .find(|span| span.name == "hac.select")
        .expect("hac.select span must be recorded");
    assert_eq!(span.fields.get("candidates").map(String::as_str), Some("5"));
    assert_eq!(span.fields.get("selected").map(String::as_str), Some("3"));
    assert_eq!(span.fields.get("function").map(String::as_str), Some("max"));
}

fn random_layout() -> impl Strategy<Value = (HostTopology, Vec<Node>)> {
    (1_usize..6, 1_usize..4).prop_flat_map(|(host_count, per_host)| {
        let pairs = host_count * host_count.saturating_sub(1) / 2;
        proptest::collection::vec(proptest::option::of(0_i64..100), pairs).prop_map(
            move |weights| {
                let names: Vec<String> = (0..host_count).map(|index| format!("h{index}")).collect();
                let mut weights = weights.into_iter();
                let mut topology = HostTopology::new();
                let mut nodes = Vec::new();
                for (index, name) in names.iter().enumerate() {
                    let row: Vec<(String, i64)> = names
                        .iter()
                        .take(index)
                        .filter_map(|other| {
                            weights.next().flatten().map(|weight| (other.clone(), weight))
                        })
                        .collect();
                    topology.add_host(name.clone(), row);
                    nodes.extend(
                        (0..per_host).map(|slot| Node::new(name, format!("{name}/{slot}"))),
                    );
                }
                (topology, nodes)
            },
        )
    })
}

fn any_function() -> impl Strategy<Value = DistanceFunction> {
    prop_oneof![
        Just(DistanceFunction::Avg),
        Just(DistanceFunction::Max),
        Just(DistanceFunction::Min),
    ]
}

proptest! {
    #![proptest_config(suite_proptest_config(128))]

    #[test]
    fn floating_selection_stays_within_bounds(
        (topology, nodes) in random_layout(),
        number in 0_usize..12,
        threshold in 0_i64..120,
        function in any_function(),
    ) {
        let hac = Hac::new(&topology, &[], function, threshold).expect("empty pivot is valid");
        let selected = hac.select(number, &nodes).expect("known hosts are available");
        prop_assert!(selected.len() <= number);
        let unique: HashSet<&str> = selected.iter().map(Node::key).collect();
        prop_assert_eq!(unique.len(), selected.len());
        prop_assert!(selected.iter().all(|node| nodes.contains(node)));
    }

    #[test]
    fn floating_selection_without_admissible_pairs_keeps_the_first_candidate(
        (topology, nodes) in random_layout(),
        number in 1_usize..12,
        function in any_function(),
    ) {
        let hac = Hac::new(&topology, &[], function, -1).expect("empty pivot is valid");
        let selected = hac.select(number, &nodes).expect("known hosts are available");
        prop_assert_eq!(selected, nodes[..1].to_vec());
    }

    #[test]
    fn pivot_selection_excludes_pivot_and_stays_within_bounds(
        (topology, nodes) in random_layout(),
        number in 0_usize..12,
        function in any_function(),
    ) {
        let pivot = &nodes[..1];
        let hac = Hac::new(&topology, pivot, function, i64::MAX).expect("one pivot is valid");
        let selected = hac.select(number, &nodes).expect("known hosts are available");
        prop_assert!(selected.len() <= number);
        prop_assert!(!selected.contains(&nodes[0]));
    }
}
