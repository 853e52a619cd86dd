//! Hub detection, parent inference, and session-to-graph folding.
//!
//! The engine decides two things about every freshly-seen page: whether it is
//! a "hub" (a common return/junction point such as a dashboard), and which
//! existing node its incoming edge should attach to. Hubs anchor the graph's
//! branching structure.

use crate::identity::signature;
use crate::logging::structured::LogContext;
use crate::model::event::{Event, Phase};
use crate::model::ids::{self, NodeId};
use crate::model::records::{
    ChainEdge, ChainPoint, CreatedBy, EdgeReason, RecordChain, RecordingSession,
};

use super::map::MapGraph;

use std::collections::HashSet;

/// URL substrings that mark a page as a hub, matched case-insensitively.
const HUB_PATTERNS: &[&str] = &["/my/", "/mystudent", "/dashboard", "/course/view.php"];

/// Outcome of the parent-inference policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentInference {
    pub parent_node_id: Option<NodeId>,
    pub reason: EdgeReason,
}

/// Folds recorded sessions into the navigation map.
#[derive(Debug, Default)]
pub struct AutoMappingEngine {
    learned_hub_signatures: HashSet<String>,
}

impl AutoMappingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a page is a hub: its URL contains a known hub pattern, or its
    /// signature was explicitly learned via [`mark_as_hub`].
    ///
    /// [`mark_as_hub`]: AutoMappingEngine::mark_as_hub
    pub fn detect_hub(&self, url: &str, signature: &str) -> bool {
        let lowered = url.to_lowercase();
        if HUB_PATTERNS.iter().any(|p| lowered.contains(p)) {
            return true;
        }
        self.learned_hub_signatures.contains(signature)
    }

    /// Learn a signature as a hub.
    pub fn mark_as_hub(&mut self, signature: &str) {
        self.learned_hub_signatures.insert(signature.to_string());
    }

    /// Decide which node a new node's incoming edge attaches to.
    ///
    /// Deterministic priority policy, first matching rule wins:
    /// 1. manual parent supplied -> attach there (`ManualParent`)
    /// 2. new node is itself a hub -> root-level, no parent (`HubMatch`)
    /// 3. preceding interaction was a navigational click and a known hub
    ///    exists -> nearest known hub (`NavClick`)
    /// 4. context switch flagged and a known hub exists -> nearest known hub
    ///    (`ContextSwitch`)
    /// 5. otherwise -> the last visited node (`DirectNav`)
    ///
    /// Explicit operator intent beats structural hub status beats contextual
    /// heuristics beats the naive fallback.
    pub fn infer_parent_node(
        &self,
        last_node_id: Option<&str>,
        known_hubs: &[ChainPoint],
        new_node_is_hub: bool,
        last_click_was_nav: bool,
        context_switch: bool,
        manual_parent_id: Option<&str>,
    ) -> ParentInference {
        if let Some(manual) = manual_parent_id {
            return ParentInference {
                parent_node_id: Some(manual.to_string()),
                reason: EdgeReason::ManualParent,
            };
        }
        if new_node_is_hub {
            return ParentInference {
                parent_node_id: None,
                reason: EdgeReason::HubMatch,
            };
        }
        let closest_hub = known_hubs.first();
        if last_click_was_nav {
            if let Some(hub) = closest_hub {
                return ParentInference {
                    parent_node_id: Some(hub.id.clone()),
                    reason: EdgeReason::NavClick,
                };
            }
        }
        if context_switch {
            if let Some(hub) = closest_hub {
                return ParentInference {
                    parent_node_id: Some(hub.id.clone()),
                    reason: EdgeReason::ContextSwitch,
                };
            }
        }
        ParentInference {
            parent_node_id: last_node_id.map(str::to_string),
            reason: EdgeReason::DirectNav,
        }
    }

    /// Fold one finished session into the graph.
    ///
    /// Walks the event stream once, keeping a rolling `last_node_id` (seeded
    /// from the chain's declared root) and rolling buffers of the GraphQL
    /// operation names and AJAX method names seen since the last navigation.
    /// Each `Finished` navigation is deduplicated by signature against the
    /// graph; a novel signature creates a node, a known one reuses the
    /// existing node id. Edges are attached via the parent-inference policy
    /// using the previous node's hub ancestry. JSON network responses feed
    /// the API-name buffers for the *next* navigation's signature; everything
    /// else is ignored by the fold.
    pub fn update_graph(
        &self,
        graph: &mut MapGraph,
        session: &RecordingSession,
        chain: &RecordChain,
    ) {
        let ctx = LogContext::new(&session.id).with_chain(&chain.id);
        log::info!(
            "{} GRAPH_FOLD_START events={} nodes_before={}",
            ctx,
            session.events.len(),
            graph.node_count()
        );

        let mut last_node_id: Option<NodeId> = chain.root_node_id.clone();
        let mut graphql_ops: Vec<String> = Vec::new();
        let mut ajax_methods: Vec<String> = Vec::new();

        for event in &session.events {
            match event {
                Event::Navigation { url, phase, .. } => {
                    if *phase != Phase::Finished {
                        continue;
                    }
                    let sig = signature::compute_node_signature(url, &graphql_ops, &ajax_methods);
                    let is_hub = self.detect_hub(url, &sig);

                    let node_id = match graph.find_node_by_signature(&sig) {
                        Some(existing) => {
                            log::debug!("{} NODE_DEDUP_HIT id={} url={}", ctx, existing.id, url);
                            existing.id.clone()
                        }
                        None => {
                            let id = ids::node_id();
                            graph.upsert_node(ChainPoint {
                                id: id.clone(),
                                name: extract_page_name(url),
                                url: url.clone(),
                                url_pattern: None,
                                tags: Vec::new(),
                                signature: sig,
                                is_hub,
                            });
                            log::info!("{} NODE_CREATED id={} is_hub={} url={}", ctx, id, is_hub, url);
                            id
                        }
                    };

                    if let Some(prev) = last_node_id.clone() {
                        if prev != node_id {
                            let hubs = graph.find_hub_ancestors(&prev);
                            let inference = self.infer_parent_node(
                                Some(&prev),
                                &hubs,
                                is_hub,
                                false,
                                false,
                                None,
                            );
                            if let Some(parent) = inference.parent_node_id {
                                let edge = ChainEdge {
                                    id: ids::edge_id(),
                                    from_node_id: parent,
                                    to_node_id: node_id.clone(),
                                    created_by: CreatedBy::Auto,
                                    reason: inference.reason,
                                    label: None,
                                };
                                log::debug!(
                                    "{} EDGE_INFERRED from={} to={} reason={:?}",
                                    ctx,
                                    edge.from_node_id,
                                    edge.to_node_id,
                                    edge.reason
                                );
                                graph.upsert_edge(edge);
                            } else {
                                log::debug!(
                                    "{} EDGE_SKIPPED to={} reason={:?}",
                                    ctx,
                                    node_id,
                                    inference.reason
                                );
                            }
                        }
                    }
                    last_node_id = Some(node_id);
                    graphql_ops.clear();
                    ajax_methods.clear();
                }
                Event::NetworkResponse {
                    content_type: Some(content_type),
                    body_snippet: Some(body),
                    ..
                } if content_type.contains("json") => {
                    if let Some(op) = signature::extract_graphql_operation_name(body) {
                        graphql_ops.push(op);
                    }
                    if let Some(method) = signature::extract_moodle_ajax_method(body) {
                        ajax_methods.push(method);
                    }
                }
                _ => {}
            }
        }

        log::info!(
            "{} GRAPH_FOLD_COMPLETE nodes={} edges={}",
            ctx,
            graph.node_count(),
            graph.edge_count()
        );
    }
}

/// Display name for a page: the last URL path segment, `"root"` when blank.
pub(crate) fn extract_page_name(url: &str) -> String {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let no_query = after_scheme.split('?').next().unwrap_or(after_scheme);
    let path = no_query
        .split_once('/')
        .map(|(_, rest)| rest)
        .unwrap_or(no_query);
    let last = path.rsplit('/').next().unwrap_or("");
    if last.trim().is_empty() {
        "root".to_string()
    } else {
        last.to_string()
    }
}
