//! Session, chain, and graph records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::event::Event;
use super::ids::{CallId, ChainId, EdgeId, NodeId, SessionId};

/// A user-declared logical grouping of navigation nodes (one flow, e.g.
/// "enrollment"). Created by the operator before recording; node ids are
/// appended as points are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordChain {
    pub id: ChainId,
    pub name: String,
    #[serde(default)]
    pub root_node_id: Option<NodeId>,
    #[serde(default)]
    pub node_ids: Vec<NodeId>,
}

/// A deduplicated, named location in the navigation space.
///
/// `signature` is the dedup key: two navigations are "the same page" iff they
/// produce the same signature, and signature equality implies node identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainPoint {
    pub id: NodeId,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub url_pattern: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub is_hub: bool,
}

/// Who created an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreatedBy {
    Manual,
    Auto,
}

/// The mechanism that attached an edge, in inference-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeReason {
    ManualParent,
    HubMatch,
    NavClick,
    ContextSwitch,
    DirectNav,
}

/// A directed edge between two chain points. Append-only per id; re-adding an
/// edge with the same id replaces it. Duplicate edges under different ids are
/// not merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEdge {
    pub id: EdgeId,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    pub created_by: CreatedBy,
    pub reason: EdgeReason,
    #[serde(default)]
    pub label: Option<String>,
}

/// Configuration for what data to capture during recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureFilters {
    /// Host substrings to capture network traffic for (empty = all hosts).
    #[serde(default)]
    pub host_allowlist: Vec<String>,
    /// Content types to capture response bodies for.
    pub content_type_allowlist: Vec<String>,
    /// Maximum characters to keep from request/response bodies.
    pub max_body_bytes: usize,
    /// Whether to redact sensitive data (tokens, cookies) on export.
    pub redact: bool,
}

impl Default for CaptureFilters {
    fn default() -> Self {
        Self {
            host_allowlist: Vec::new(),
            content_type_allowlist: vec!["application/json".to_string(), "text/html".to_string()],
            max_body_bytes: 256_000,
            redact: true,
        }
    }
}

impl CaptureFilters {
    /// Whether network traffic for `url` should be captured. Empty allowlist
    /// means all hosts; unparseable URLs are allowed (fail-open).
    pub fn allows_host(&self, url: &str) -> bool {
        if self.host_allowlist.is_empty() {
            return true;
        }
        match host_of(url) {
            Some(host) => self.host_allowlist.iter().any(|a| host.contains(a.as_str())),
            None => true,
        }
    }

    /// Whether a response body of the given content type should be kept.
    pub fn allows_content_type(&self, content_type: &str) -> bool {
        self.content_type_allowlist.is_empty()
            || self
                .content_type_allowlist
                .iter()
                .any(|a| content_type.contains(a.as_str()))
    }
}

/// Host component of a URL, without port handling beyond a plain substring
/// view (`host:port` is returned as-is).
fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let host = &rest[..end];
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// A reconstructed request/response pair, keyed by `call_id`.
///
/// Created when the request event arrives and completed in place when the
/// matching response arrives; never deleted within a session.
/// `graphql_operation_name` and `moodle_ajax_method` are a later derivation
/// step and stay unset during capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpCall {
    pub call_id: CallId,
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub request_body: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub response_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub response_body: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub graphql_operation_name: Option<String>,
    #[serde(default)]
    pub moodle_ajax_method: Option<String>,
    pub started_at_epoch_ms: i64,
    #[serde(default)]
    pub completed_at_epoch_ms: Option<i64>,
}

impl HttpCall {
    /// Create a call from its request leg.
    pub fn from_request(
        call_id: CallId,
        method: String,
        url: String,
        request_headers: BTreeMap<String, String>,
        request_body: Option<String>,
        started_at_epoch_ms: i64,
    ) -> Self {
        Self {
            call_id,
            url,
            method,
            request_headers,
            request_body,
            status: None,
            response_headers: BTreeMap::new(),
            response_body: None,
            content_type: None,
            graphql_operation_name: None,
            moodle_ajax_method: None,
            started_at_epoch_ms,
            completed_at_epoch_ms: None,
        }
    }

    /// Complete the call with its response leg.
    pub fn complete(
        &mut self,
        status: u16,
        response_headers: BTreeMap<String, String>,
        response_body: Option<String>,
        content_type: Option<String>,
        completed_at_epoch_ms: i64,
    ) {
        self.status = Some(status);
        self.response_headers = response_headers;
        self.response_body = response_body;
        self.content_type = content_type;
        self.completed_at_epoch_ms = Some(completed_at_epoch_ms);
    }
}

/// One bounded recording pass. Frozen once stopped: the archived session's
/// data feeds exactly one graph-update pass and is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSession {
    pub id: SessionId,
    #[serde(default)]
    pub chain_id: Option<ChainId>,
    pub started_at_epoch_ms: i64,
    #[serde(default)]
    pub ended_at_epoch_ms: Option<i64>,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub filters: CaptureFilters,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub calls: Vec<HttpCall>,
}
