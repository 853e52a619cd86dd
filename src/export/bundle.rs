//! Export bundle assembly.
//!
//! Produces a complete, redacted, serializable snapshot of recorded state:
//! one graph document, chain documents keyed by chain id, redacted session
//! documents keyed by session id, and derived response schemas keyed by call
//! id. Sufficient for a downstream tool to reconstruct the navigation map,
//! inspect redacted traffic, and see inferred response shapes without
//! re-deriving them.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::graph::map::MapGraph;
use crate::model::ids::{CallId, ChainId, SessionId};
use crate::model::records::{RecordChain, RecordingSession};
use crate::schema::derive::derive_schema;
use crate::security::redaction::redact_session;

/// Serialization failure while assembling a bundle.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// The four logical documents of an export.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleContent {
    pub map_json: String,
    pub chains_json: BTreeMap<ChainId, String>,
    pub sessions_json: BTreeMap<SessionId, String>,
    pub schemas_json: BTreeMap<CallId, String>,
}

fn to_pretty<T: serde::Serialize>(value: &T, what: &'static str) -> Result<String, ExportError> {
    serde_json::to_string_pretty(value).map_err(|source| ExportError::Serialize { what, source })
}

/// Assemble a bundle over the full recorded state.
///
/// Every session is redacted first. Schemas are derived per call from the
/// redacted response bodies of JSON calls and included only when non-empty.
pub fn create_bundle(
    graph: &MapGraph,
    chains: &[RecordChain],
    sessions: &[RecordingSession],
) -> Result<BundleContent, ExportError> {
    let redacted_sessions: Vec<RecordingSession> = sessions.iter().map(redact_session).collect();

    let map_json = to_pretty(graph, "graph")?;

    let mut chains_json = BTreeMap::new();
    for chain in chains {
        chains_json.insert(chain.id.clone(), to_pretty(chain, "chain")?);
    }

    let mut sessions_json = BTreeMap::new();
    let mut schemas_json = BTreeMap::new();
    for session in &redacted_sessions {
        sessions_json.insert(session.id.clone(), to_pretty(session, "session")?);

        for call in &session.calls {
            let is_json = call
                .content_type
                .as_deref()
                .map(|ct| ct.contains("json"))
                .unwrap_or(false);
            if !is_json {
                continue;
            }
            if let Some(body) = &call.response_body {
                let schema = derive_schema(body);
                if !schema.is_empty() {
                    schemas_json.insert(call.call_id.clone(), to_pretty(&schema, "schema")?);
                }
            }
        }
    }

    log::info!(
        "BUNDLE_CREATED chains={} sessions={} schemas={}",
        chains_json.len(),
        sessions_json.len(),
        schemas_json.len()
    );

    Ok(BundleContent {
        map_json,
        chains_json,
        sessions_json,
        schemas_json,
    })
}

/// Serialize one graph document.
pub fn graph_json(graph: &MapGraph) -> Result<String, ExportError> {
    to_pretty(graph, "graph")
}

/// Serialize one chain document.
pub fn chain_json(chain: &RecordChain) -> Result<String, ExportError> {
    to_pretty(chain, "chain")
}

/// Serialize one session document, redacting it first.
pub fn session_json(session: &RecordingSession) -> Result<String, ExportError> {
    to_pretty(&redact_session(session), "session")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap as Map;

    use super::*;
    use crate::model::records::{CaptureFilters, HttpCall};

    fn json_session(redact: bool) -> RecordingSession {
        let mut headers = Map::new();
        headers.insert("Authorization".to_string(), "Bearer topsecret".to_string());

        RecordingSession {
            id: "sess_1".to_string(),
            chain_id: Some("chain_1".to_string()),
            started_at_epoch_ms: 0,
            ended_at_epoch_ms: Some(50),
            target_url: None,
            filters: CaptureFilters {
                redact,
                ..CaptureFilters::default()
            },
            events: Vec::new(),
            calls: vec![
                HttpCall {
                    call_id: "call_json".to_string(),
                    url: "https://x/graphql".to_string(),
                    method: "POST".to_string(),
                    request_headers: headers,
                    request_body: Some(r#"{"access_token":"topsecret"}"#.to_string()),
                    status: Some(200),
                    response_headers: Map::new(),
                    response_body: Some(r#"{"data":{"grade":1.3}}"#.to_string()),
                    content_type: Some("application/json".to_string()),
                    graphql_operation_name: None,
                    moodle_ajax_method: None,
                    started_at_epoch_ms: 1,
                    completed_at_epoch_ms: Some(2),
                },
                HttpCall {
                    call_id: "call_html".to_string(),
                    url: "https://x/page".to_string(),
                    method: "GET".to_string(),
                    request_headers: Map::new(),
                    request_body: None,
                    status: Some(200),
                    response_headers: Map::new(),
                    response_body: Some("<html></html>".to_string()),
                    content_type: Some("text/html".to_string()),
                    graphql_operation_name: None,
                    moodle_ajax_method: None,
                    started_at_epoch_ms: 3,
                    completed_at_epoch_ms: Some(4),
                },
            ],
        }
    }

    fn chain() -> RecordChain {
        RecordChain {
            id: "chain_1".to_string(),
            name: "grades".to_string(),
            root_node_id: None,
            node_ids: Vec::new(),
        }
    }

    #[test]
    fn test_bundle_completeness() {
        let bundle =
            create_bundle(&MapGraph::new(), &[chain()], &[json_session(true)]).unwrap();

        assert!(bundle.chains_json.contains_key("chain_1"));
        assert!(bundle.sessions_json.contains_key("sess_1"));
        // Only the JSON call yields a schema.
        assert!(bundle.schemas_json.contains_key("call_json"));
        assert!(!bundle.schemas_json.contains_key("call_html"));
    }

    #[test]
    fn test_bundle_is_redacted() {
        let bundle =
            create_bundle(&MapGraph::new(), &[chain()], &[json_session(true)]).unwrap();

        let session_doc = &bundle.sessions_json["sess_1"];
        assert!(!session_doc.contains("topsecret"));
        assert!(session_doc.contains("<redacted>"));
    }

    #[test]
    fn test_bundle_schema_content() {
        let bundle =
            create_bundle(&MapGraph::new(), &[chain()], &[json_session(true)]).unwrap();

        let schema_doc = &bundle.schemas_json["call_json"];
        assert!(schema_doc.contains(r#""path": "$.data.grade""#));
        assert!(schema_doc.contains(r#""inferred_type": "number""#));
    }

    #[test]
    fn test_bundle_skips_unparseable_bodies() {
        let mut session = json_session(true);
        session.calls[0].response_body = Some("truncated{".to_string());

        let bundle = create_bundle(&MapGraph::new(), &[], &[session]).unwrap();
        assert!(bundle.schemas_json.is_empty());
    }

    #[test]
    fn test_session_json_redacts() {
        let doc = session_json(&json_session(true)).unwrap();
        assert!(!doc.contains("topsecret"));
    }
}
