//! Property tests for hub-connectivity filtering.
//!
//! Run: cargo nextest run --test graph_properties

use std::collections::{BTreeSet, HashMap, VecDeque};

use kg_visualizer::graph::{Graph, Triple, connect_to_hub, degree_map, main_hub, normalize};
use proptest::prelude::*;

fn entity() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[A-H]".prop_map(String::from),
        1 => Just(String::new()),
        1 => Just("  ".to_string()),
        1 => "[A-H]".prop_map(|s| format!(" {} ", s)),
    ]
}

fn triples() -> impl Strategy<Value = Vec<Triple>> {
    prop::collection::vec(
        (entity(), "[a-c]{0,2}", entity()).prop_map(|(s, r, t)| Triple::new(s, r, t)),
        0..24,
    )
}

fn as_triples(graph: &Graph) -> Vec<Triple> {
    graph
        .links
        .iter()
        .map(|l| Triple::new(&l.source, &l.relation, &l.target))
        .collect()
}

fn is_connected(graph: &Graph) -> bool {
    let Some(first) = graph.nodes.first() else {
        return true;
    };
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in &graph.links {
        adjacency.entry(&link.source).or_default().push(&link.target);
        adjacency.entry(&link.target).or_default().push(&link.source);
    }

    let mut seen = BTreeSet::from([first.id.as_str()]);
    let mut queue = VecDeque::from([first.id.as_str()]);
    while let Some(node) = queue.pop_front() {
        for &next in adjacency.get(node).into_iter().flatten() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen.len() == graph.nodes.len()
}

proptest! {
    #[test]
    fn prop_idempotent(input in triples()) {
        let once = connect_to_hub(&input);
        let twice = connect_to_hub(&as_triples(&once));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_nodes_are_link_endpoints(input in triples()) {
        let graph = connect_to_hub(&input);
        let endpoints: BTreeSet<&str> = graph
            .links
            .iter()
            .flat_map(|l| [l.source.as_str(), l.target.as_str()])
            .collect();
        let nodes: BTreeSet<&str> = graph.node_ids().collect();
        prop_assert_eq!(endpoints, nodes);
    }

    #[test]
    fn prop_single_component(input in triples()) {
        prop_assert!(is_connected(&connect_to_hub(&input)));
    }

    #[test]
    fn prop_hub_survives(input in triples()) {
        let links = normalize(&input);
        let degree = degree_map(&links);
        let graph = connect_to_hub(&input);
        match main_hub(&degree) {
            Some(hub) => prop_assert!(graph.node_ids().any(|id| id == hub)),
            None => prop_assert!(graph.nodes.is_empty() && graph.links.is_empty()),
        }
    }

    #[test]
    fn prop_nodes_sorted_and_links_ordered(input in triples()) {
        let graph = connect_to_hub(&input);
        let ids: Vec<&str> = graph.node_ids().collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(ids, sorted);

        // kept links are a subsequence of the normalized input
        let normalized = normalize(&input);
        let mut rest = normalized.iter();
        for link in &graph.links {
            prop_assert!(rest.any(|l| l == link));
        }
    }
}

#[test]
fn test_reference_example() {
    let graph = connect_to_hub(&[
        Triple::new("A", "rel1", "B"),
        Triple::new("B", "rel2", "C"),
        Triple::new("X", "rel3", "Y"),
    ]);
    assert_eq!(graph.node_ids().collect::<Vec<_>>(), ["A", "B", "C"]);
    let pairs: Vec<(&str, &str)> = graph
        .links
        .iter()
        .map(|l| (l.source.as_str(), l.target.as_str()))
        .collect();
    assert_eq!(pairs, [("A", "B"), ("B", "C")]);
}
