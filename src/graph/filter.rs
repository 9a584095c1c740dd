//! Connect-to-hub filter.
//!
//! Keeps only the connected component that contains the highest-degree node,
//! so the rendered graph is a single cluster around its main entity.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::{Graph, Link, Node, Triple};

/// Undirected degree per node id, ordered by id.
pub type DegreeMap = BTreeMap<String, usize>;

/// Trims every field and drops triples with an empty source, relation or target.
pub fn normalize(triples: &[Triple]) -> Vec<Link> {
    triples
        .iter()
        .filter_map(|t| {
            let source = t.source.trim();
            let relation = t.relation.trim();
            let target = t.target.trim();
            if source.is_empty() || relation.is_empty() || target.is_empty() {
                return None;
            }
            Some(Link {
                source: source.to_string(),
                target: target.to_string(),
                relation: relation.to_string(),
            })
        })
        .collect()
}

pub fn degree_map(links: &[Link]) -> DegreeMap {
    let mut degree = DegreeMap::new();
    for link in links {
        *degree.entry(link.source.clone()).or_default() += 1;
        *degree.entry(link.target.clone()).or_default() += 1;
    }
    degree
}

/// Highest-degree node; ties resolve to the lexicographically smallest id.
pub fn main_hub(degree: &DegreeMap) -> Option<&str> {
    let mut best: Option<(&str, usize)> = None;
    for (id, &d) in degree {
        match best {
            Some((_, max)) if d <= max => {}
            _ => best = Some((id.as_str(), d)),
        }
    }
    best.map(|(id, _)| id)
}

fn component_of<'a>(hub: &'a str, links: &'a [Link]) -> BTreeSet<&'a str> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in links {
        adjacency
            .entry(link.source.as_str())
            .or_default()
            .push(link.target.as_str());
        adjacency
            .entry(link.target.as_str())
            .or_default()
            .push(link.source.as_str());
    }

    let mut connected = BTreeSet::from([hub]);
    let mut queue = VecDeque::from([hub]);
    while let Some(node) = queue.pop_front() {
        for &next in adjacency.get(node).into_iter().flatten() {
            if connected.insert(next) {
                queue.push_back(next);
            }
        }
    }
    connected
}

/// Builds the visualization graph from raw extractor triples.
///
/// Invalid triples are dropped, the main hub is selected by degree and only
/// links whose endpoints both lie in the hub's component survive. Empty or
/// entirely invalid input yields an empty graph.
pub fn connect_to_hub(triples: &[Triple]) -> Graph {
    let links = normalize(triples);
    let degree = degree_map(&links);

    let Some(hub) = main_hub(&degree) else {
        return Graph::default();
    };

    let connected = component_of(hub, &links);
    let nodes = connected
        .iter()
        .map(|id| Node { id: id.to_string() })
        .collect();
    let kept: Vec<Link> = links
        .iter()
        .filter(|l| connected.contains(l.source.as_str()) && connected.contains(l.target.as_str()))
        .cloned()
        .collect();

    tracing::debug!(
        hub,
        nodes = connected.len(),
        dropped_links = links.len() - kept.len(),
        "hub filter applied"
    );

    Graph { nodes, links: kept }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str, r: &str, o: &str) -> Triple {
        Triple::new(s, r, o)
    }

    fn ids(graph: &Graph) -> Vec<&str> {
        graph.node_ids().collect()
    }

    #[test]
    fn test_drops_disconnected_component() {
        let triples = vec![t("A", "rel1", "B"), t("B", "rel2", "C"), t("X", "rel3", "Y")];
        let graph = connect_to_hub(&triples);

        assert_eq!(ids(&graph), vec!["A", "B", "C"]);
        let pairs: Vec<_> = graph
            .links
            .iter()
            .map(|l| (l.source.as_str(), l.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "B"), ("B", "C")]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(connect_to_hub(&[]), Graph::default());
    }

    #[test]
    fn test_blank_fields_are_discarded() {
        let triples = vec![t("  ", "rel", "B"), t("A", "", "B"), t("A", "rel", " \t")];
        let graph = connect_to_hub(&triples);
        assert!(graph.nodes.is_empty());
        assert!(graph.links.is_empty());
    }

    #[test]
    fn test_fields_are_trimmed() {
        let graph = connect_to_hub(&[t(" Rust ", " created by ", "Mozilla\n")]);
        assert_eq!(ids(&graph), vec!["Mozilla", "Rust"]);
        assert_eq!(graph.links[0].relation, "created by");
    }

    #[test]
    fn test_hub_tie_breaks_to_smallest_id() {
        // Both components have a degree-2 center; "K" < "M" so K's side wins.
        let triples = vec![
            t("M", "r", "N"),
            t("M", "r", "O"),
            t("K", "r", "L"),
            t("K", "r", "J"),
        ];
        let links = normalize(&triples);
        let degree = degree_map(&links);
        assert_eq!(main_hub(&degree), Some("K"));

        let graph = connect_to_hub(&triples);
        assert_eq!(ids(&graph), vec!["J", "K", "L"]);
    }

    #[test]
    fn test_duplicates_are_tolerated() {
        let triples = vec![t("A", "r", "B"), t("A", "r", "B"), t("C", "r", "D")];
        let graph = connect_to_hub(&triples);
        assert_eq!(ids(&graph), vec!["A", "B"]);
        assert_eq!(graph.links.len(), 2);
    }

    #[test]
    fn test_indirect_reachability_keeps_order() {
        let triples = vec![
            t("D", "r", "E"),
            t("hub", "r", "A"),
            t("C", "r", "D"),
            t("hub", "r", "B"),
            t("B", "r", "C"),
            t("hub", "r", "Z"),
        ];
        let graph = connect_to_hub(&triples);
        assert_eq!(ids(&graph), vec!["A", "B", "C", "D", "E", "Z", "hub"]);
        let sources: Vec<_> = graph.links.iter().map(|l| l.source.as_str()).collect();
        assert_eq!(sources, vec!["D", "hub", "C", "hub", "B", "hub"]);
    }

    #[test]
    fn test_self_loop_counts_twice() {
        let links = normalize(&[t("A", "r", "A"), t("B", "r", "C")]);
        let degree = degree_map(&links);
        assert_eq!(degree["A"], 2);
        assert_eq!(main_hub(&degree), Some("A"));
    }
}
