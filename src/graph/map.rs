//! The persistent navigation map.
//!
//! A mutable store of deduplicated chain points and inferred edges with
//! idempotent upsert semantics and a cycle-safe ancestor query. Ordered maps
//! keep iteration and serialization deterministic; edge ids embed their
//! creation timestamp, so id order tracks insertion order closely.
//!
//! Edge endpoints are not validated against the node set - callers must
//! not construct dangling edges.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::model::ids::{EdgeId, NodeId};
use crate::model::records::{CaptureFilters, ChainEdge, ChainPoint};

/// Metadata stamped on the graph at generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub generated_at: i64,
    pub app_version: String,
    pub filters_used: CaptureFilters,
}

impl Default for GraphMetadata {
    fn default() -> Self {
        Self {
            generated_at: Utc::now().timestamp_millis(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            filters_used: CaptureFilters::default(),
        }
    }
}

/// The mutable node/edge store. Survives across sessions; mutated only
/// through `upsert_node`/`upsert_edge`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapGraph {
    nodes: BTreeMap<NodeId, ChainPoint>,
    edges: BTreeMap<EdgeId, ChainEdge>,
    pub metadata: GraphMetadata,
}

impl MapGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ChainPoint> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &ChainEdge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Insert or replace a node by id. Replacement is total, not a merge.
    pub fn upsert_node(&mut self, node: ChainPoint) {
        log::debug!(
            "GRAPH_UPSERT_NODE id={} name={} is_hub={}",
            node.id,
            node.name,
            node.is_hub
        );
        self.nodes.insert(node.id.clone(), node);
    }

    /// Insert or replace an edge by id. Endpoints are not validated.
    pub fn upsert_edge(&mut self, edge: ChainEdge) {
        log::debug!(
            "GRAPH_UPSERT_EDGE id={} from={} to={} reason={:?}",
            edge.id,
            edge.from_node_id,
            edge.to_node_id,
            edge.reason
        );
        self.edges.insert(edge.id.clone(), edge);
    }

    pub fn find_node(&self, id: &str) -> Option<&ChainPoint> {
        self.nodes.get(id)
    }

    /// Dedup lookup: the node carrying this signature, if any.
    pub fn find_node_by_signature(&self, signature: &str) -> Option<&ChainPoint> {
        self.nodes.values().find(|n| n.signature == signature)
    }

    /// All hub ancestors of a node, nearest-first, found by walking the
    /// incoming-edge chain backward (each step: the first edge whose
    /// `to_node_id` is the cursor). The start node itself is examined too.
    ///
    /// A visited set guarantees termination even if the edge set contains a
    /// cycle; cycles should not occur by construction but are not actively
    /// rejected.
    pub fn find_hub_ancestors(&self, node_id: &str) -> Vec<ChainPoint> {
        let mut result = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut current: Option<String> = Some(node_id.to_string());

        while let Some(id) = current {
            if !visited.insert(id.clone()) {
                break;
            }
            if let Some(node) = self.find_node(&id) {
                if node.is_hub {
                    result.push(node.clone());
                }
            }
            current = self
                .edges
                .values()
                .find(|e| e.to_node_id == id)
                .map(|e| e.from_node_id.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::records::{CreatedBy, EdgeReason};

    fn point(id: &str, is_hub: bool) -> ChainPoint {
        ChainPoint {
            id: id.to_string(),
            name: id.to_string(),
            url: format!("https://x/{}", id),
            url_pattern: None,
            tags: Vec::new(),
            signature: format!("url:https://x/{}|gql:|ajax:", id),
            is_hub,
        }
    }

    fn edge(id: &str, from: &str, to: &str) -> ChainEdge {
        ChainEdge {
            id: id.to_string(),
            from_node_id: from.to_string(),
            to_node_id: to.to_string(),
            created_by: CreatedBy::Auto,
            reason: EdgeReason::DirectNav,
            label: None,
        }
    }

    #[test]
    fn test_upsert_node_replaces() {
        let mut graph = MapGraph::new();
        graph.upsert_node(point("a", false));
        graph.upsert_node(ChainPoint {
            name: "renamed".to_string(),
            ..point("a", true)
        });

        assert_eq!(graph.node_count(), 1);
        let node = graph.find_node("a").unwrap();
        assert_eq!(node.name, "renamed");
        assert!(node.is_hub);
    }

    #[test]
    fn test_find_node_by_signature() {
        let mut graph = MapGraph::new();
        graph.upsert_node(point("a", false));

        assert_eq!(
            graph
                .find_node_by_signature("url:https://x/a|gql:|ajax:")
                .map(|n| n.id.as_str()),
            Some("a")
        );
        assert!(graph.find_node_by_signature("url:https://x/z|gql:|ajax:").is_none());
    }

    #[test]
    fn test_hub_ancestors_nearest_first() {
        let mut graph = MapGraph::new();
        graph.upsert_node(point("dash", true));
        graph.upsert_node(point("course", true));
        graph.upsert_node(point("leaf", false));
        graph.upsert_edge(edge("e1", "dash", "course"));
        graph.upsert_edge(edge("e2", "course", "leaf"));

        let hubs = graph.find_hub_ancestors("leaf");
        let ids: Vec<&str> = hubs.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["course", "dash"]);
    }

    #[test]
    fn test_hub_ancestors_includes_start_node() {
        let mut graph = MapGraph::new();
        graph.upsert_node(point("dash", true));

        let hubs = graph.find_hub_ancestors("dash");
        assert_eq!(hubs.len(), 1);
        assert_eq!(hubs[0].id, "dash");
    }

    #[test]
    fn test_hub_ancestors_terminates_on_cycle() {
        let mut graph = MapGraph::new();
        graph.upsert_node(point("a", true));
        graph.upsert_node(point("b", false));
        graph.upsert_edge(edge("e1", "a", "b"));
        graph.upsert_edge(edge("e2", "b", "a"));

        let hubs = graph.find_hub_ancestors("a");
        assert_eq!(hubs.iter().filter(|n| n.id == "a").count(), 1);
    }

    #[test]
    fn test_hub_ancestors_without_edges() {
        let mut graph = MapGraph::new();
        graph.upsert_node(point("solo", false));
        assert!(graph.find_hub_ancestors("solo").is_empty());
        assert!(graph.find_hub_ancestors("missing").is_empty());
    }

    #[test]
    fn test_graph_serialization_roundtrip() {
        let mut graph = MapGraph::new();
        graph.upsert_node(point("a", true));
        graph.upsert_edge(edge("e1", "a", "a"));

        let json = serde_json::to_string(&graph).unwrap();
        let back: MapGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);
    }
}
