//! Session lifecycle orchestration.
//!
//! A state machine over a single controller instance: *idle* (no session) ->
//! *recording* (session active) -> *idle* (session stopped, folded into the
//! graph, and archived). Events delivered while idle are silently ignored -
//! a recording tool must never crash because the host delivered late.
//!
//! The controller holds all mutable recording state (graph, chains, archived
//! sessions, event/call buffers) and provides no internal locking: it is safe
//! only under a single-writer assumption. Hosts with concurrent event
//! sources must serialize delivery themselves, e.g. via a single-consumer
//! queue.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::export::bundle::{self, BundleContent, ExportError};
use crate::graph::engine::AutoMappingEngine;
use crate::graph::map::MapGraph;
use crate::identity::signature;
use crate::logging::structured::LogContext;
use crate::model::event::{Event, Phase};
use crate::model::ids::{self, NodeId};
use crate::model::records::{
    CaptureFilters, ChainEdge, ChainPoint, CreatedBy, EdgeReason, HttpCall, RecordChain,
    RecordingSession,
};

/// Orchestrates recording sessions atop the mapping engine and graph store.
#[derive(Debug, Default)]
pub struct RecorderController {
    current_chain: Option<RecordChain>,
    current_session: Option<RecordingSession>,
    graph: MapGraph,
    chains: Vec<RecordChain>,
    sessions: Vec<RecordingSession>,
    events: Vec<Event>,
    calls: Vec<HttpCall>,
    engine: AutoMappingEngine,
}

impl RecorderController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.current_session.is_some()
    }

    pub fn current_chain_name(&self) -> Option<&str> {
        self.current_chain.as_ref().map(|c| c.name.as_str())
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// URL of the most recent navigation event, empty when none captured yet.
    pub fn current_url(&self) -> &str {
        self.events
            .iter()
            .rev()
            .find_map(|event| match event {
                Event::Navigation { url, .. } => Some(url.as_str()),
                _ => None,
            })
            .unwrap_or("")
    }

    pub fn graph(&self) -> &MapGraph {
        &self.graph
    }

    pub fn chain_points(&self) -> Vec<ChainPoint> {
        self.graph.nodes().cloned().collect()
    }

    /// Register a new chain and make it current.
    ///
    /// Switching the active chain mid-recording is allowed; the last-created
    /// chain is the one a later `stop_session` folds into.
    pub fn create_chain(&mut self, name: &str) -> RecordChain {
        let chain = RecordChain {
            id: ids::chain_id(),
            name: name.to_string(),
            root_node_id: None,
            node_ids: Vec::new(),
        };
        log::info!("CHAIN_CREATED id={} name={}", chain.id, chain.name);
        self.chains.push(chain.clone());
        self.current_chain = Some(chain.clone());
        chain
    }

    /// Start a recording session bound to the current chain, clearing the
    /// event/call buffers.
    pub fn start_session(
        &mut self,
        target_url: Option<&str>,
        filters: CaptureFilters,
    ) -> RecordingSession {
        let session = RecordingSession {
            id: ids::session_id(),
            chain_id: self.current_chain.as_ref().map(|c| c.id.clone()),
            started_at_epoch_ms: Utc::now().timestamp_millis(),
            ended_at_epoch_ms: None,
            target_url: target_url.map(str::to_string),
            filters,
            events: Vec::new(),
            calls: Vec::new(),
        };
        let ctx = LogContext::new(&session.id);
        log::info!(
            "{} SESSION_STARTED target_url={:?} redact={}",
            ctx,
            session.target_url,
            session.filters.redact
        );
        self.current_session = Some(session.clone());
        self.events.clear();
        self.calls.clear();
        session
    }

    /// Stop the active session: snapshot the buffers into the frozen session,
    /// archive it, and fold it into the graph against the current chain.
    /// Returns `None` while idle.
    pub fn stop_session(&mut self) -> Option<RecordingSession> {
        let mut session = self.current_session.take()?;
        session.ended_at_epoch_ms = Some(Utc::now().timestamp_millis());
        session.events = self.events.clone();
        session.calls = self.calls.clone();

        let ctx = LogContext::new(&session.id);
        log::info!(
            "{} SESSION_STOPPED events={} calls={}",
            ctx,
            session.events.len(),
            session.calls.len()
        );

        self.sessions.push(session.clone());
        if let Some(chain) = &self.current_chain {
            self.engine.update_graph(&mut self.graph, &session, chain);
        } else {
            log::warn!("{} SESSION_UNCHAINED graph_fold_skipped", ctx);
        }
        Some(session)
    }

    pub fn add_navigation_event(&mut self, url: &str, phase: Phase) {
        if self.current_session.is_none() {
            return;
        }
        self.events.push(Event::Navigation {
            ts_epoch_ms: Utc::now().timestamp_millis(),
            url: url.to_string(),
            phase,
        });
    }

    /// Record a network request event and open its `HttpCall`.
    pub fn add_network_request(&mut self, event: Event) {
        if self.current_session.is_none() {
            return;
        }
        if let Event::NetworkRequest {
            ts_epoch_ms,
            call_id,
            method,
            url,
            headers,
            body_snippet,
        } = &event
        {
            self.calls.push(HttpCall::from_request(
                call_id.clone(),
                method.clone(),
                url.clone(),
                headers.clone(),
                body_snippet.clone(),
                *ts_epoch_ms,
            ));
            self.events.push(event);
        } else {
            log::warn!("EVENT_VARIANT_MISMATCH expected=network_request");
        }
    }

    /// Record a network response event and complete the matching call by
    /// call id. Unmatched responses are recorded as events only.
    pub fn add_network_response(&mut self, event: Event) {
        if self.current_session.is_none() {
            return;
        }
        if let Event::NetworkResponse {
            ts_epoch_ms,
            call_id,
            status,
            headers,
            body_snippet,
            content_type,
        } = &event
        {
            match self.calls.iter_mut().find(|c| &c.call_id == call_id) {
                Some(call) => call.complete(
                    *status,
                    headers.clone(),
                    body_snippet.clone(),
                    content_type.clone(),
                    *ts_epoch_ms,
                ),
                None => log::debug!("CALL_UNMATCHED call_id={}", call_id),
            }
            self.events.push(event);
        } else {
            log::warn!("EVENT_VARIANT_MISMATCH expected=network_response");
        }
    }

    pub fn add_click_event(&mut self, css_path: &str, text_snippet: Option<&str>) {
        if self.current_session.is_none() {
            return;
        }
        self.events.push(Event::Click {
            ts_epoch_ms: Utc::now().timestamp_millis(),
            css_path: css_path.to_string(),
            text_snippet: text_snippet.map(str::to_string),
        });
    }

    pub fn add_marker(&mut self, name: &str) {
        if self.current_session.is_none() {
            return;
        }
        self.events.push(Event::Marker {
            ts_epoch_ms: Utc::now().timestamp_millis(),
            name: name.to_string(),
        });
    }

    /// Update the active session's target URL.
    pub fn save_target_url(&mut self, url: &str) {
        if let Some(session) = &mut self.current_session {
            session.target_url = Some(url.to_string());
        }
    }

    /// Manually register a node, independent of live navigation capture, and
    /// optionally wire a manual parent edge. Used for operator-curated map
    /// points; the node is appended to the current chain.
    pub fn add_chain_point(
        &mut self,
        name: &str,
        url: &str,
        parent_node_id: Option<&NodeId>,
    ) -> ChainPoint {
        let sig = signature::compute_node_signature(url, &[], &[]);
        let is_hub = self.engine.detect_hub(url, &sig);
        let node = ChainPoint {
            id: ids::node_id(),
            name: name.to_string(),
            url: url.to_string(),
            url_pattern: None,
            tags: Vec::new(),
            signature: sig,
            is_hub,
        };
        log::info!(
            "CHAIN_POINT_ADDED id={} name={} manual_parent={:?}",
            node.id,
            node.name,
            parent_node_id
        );
        self.graph.upsert_node(node.clone());

        if let Some(parent) = parent_node_id {
            self.graph.upsert_edge(ChainEdge {
                id: ids::edge_id(),
                from_node_id: parent.clone(),
                to_node_id: node.id.clone(),
                created_by: CreatedBy::Manual,
                reason: EdgeReason::ManualParent,
                label: None,
            });
        }

        if let Some(chain) = &mut self.current_chain {
            chain.node_ids.push(node.id.clone());
            if let Some(stored) = self.chains.iter_mut().find(|c| c.id == chain.id) {
                stored.node_ids = chain.node_ids.clone();
            }
        }
        node
    }

    /// Learn a signature as a hub for future folds.
    pub fn mark_hub_signature(&mut self, signature: &str) {
        self.engine.mark_as_hub(signature);
    }

    /// Assemble the export bundle over the full graph, chains, and archived
    /// sessions.
    pub fn export(&self) -> Result<BundleContent, ExportError> {
        bundle::create_bundle(&self.graph, &self.chains, &self.sessions)
    }
}

/// Convenience constructor for request events, mirroring the wire fields.
pub fn network_request_event(
    ts_epoch_ms: i64,
    call_id: &str,
    method: &str,
    url: &str,
    headers: BTreeMap<String, String>,
    body_snippet: Option<String>,
) -> Event {
    Event::NetworkRequest {
        ts_epoch_ms,
        call_id: call_id.to_string(),
        method: method.to_string(),
        url: url.to_string(),
        headers,
        body_snippet,
    }
}
