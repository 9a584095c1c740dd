//! Triple graph construction and hub-connectivity filtering.

mod filter;

pub use filter::{DegreeMap, connect_to_hub, degree_map, main_hub, normalize};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A (source, relation, target) fact extracted from text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Triple {
    pub source: String,
    pub relation: String,
    pub target: String,
}

impl Triple {
    pub fn new(
        source: impl Into<String>,
        relation: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relation: relation.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
}

/// Directed edge as produced by the extractor; connectivity treats it as undirected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub relation: String,
}

/// Visualization graph: nodes sorted by id, links in extractor order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }
}
