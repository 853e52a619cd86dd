//! Captured browser events.
//!
//! Events are emitted by the embedded web view (page lifecycle callbacks plus
//! the injected capture script) and are immutable once constructed. Every
//! variant carries a millisecond epoch timestamp; the stream is assumed to be
//! in non-decreasing time order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::CallId;

/// Navigation lifecycle phase. Only `Finished` navigations drive graph
/// updates; `Started` events are kept for timing analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Started,
    Finished,
}

/// A single captured event within a recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Navigation {
        ts_epoch_ms: i64,
        url: String,
        phase: Phase,
    },
    NetworkRequest {
        ts_epoch_ms: i64,
        call_id: CallId,
        method: String,
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        body_snippet: Option<String>,
    },
    NetworkResponse {
        ts_epoch_ms: i64,
        call_id: CallId,
        status: u16,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        body_snippet: Option<String>,
        #[serde(default)]
        content_type: Option<String>,
    },
    Click {
        ts_epoch_ms: i64,
        css_path: String,
        #[serde(default)]
        text_snippet: Option<String>,
    },
    Marker {
        ts_epoch_ms: i64,
        name: String,
    },
}

impl Event {
    /// Capture timestamp of this event (epoch milliseconds).
    pub fn ts_epoch_ms(&self) -> i64 {
        match self {
            Event::Navigation { ts_epoch_ms, .. }
            | Event::NetworkRequest { ts_epoch_ms, .. }
            | Event::NetworkResponse { ts_epoch_ms, .. }
            | Event::Click { ts_epoch_ms, .. }
            | Event::Marker { ts_epoch_ms, .. } => *ts_epoch_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagged_serialization() {
        let event = Event::Navigation {
            ts_epoch_ms: 1000,
            url: "https://portal.example/my/".to_string(),
            phase: Phase::Finished,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"navigation"#));
        assert!(json.contains(r#""phase":"FINISHED"#));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_network_request_defaults() {
        let json = r#"{
            "type": "network_request",
            "ts_epoch_ms": 5,
            "call_id": "call_1",
            "method": "POST",
            "url": "https://portal.example/graphql"
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        match event {
            Event::NetworkRequest {
                headers,
                body_snippet,
                ..
            } => {
                assert!(headers.is_empty());
                assert!(body_snippet.is_none());
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_ts_accessor() {
        let event = Event::Marker {
            ts_epoch_ms: 42,
            name: "checkpoint".to_string(),
        };
        assert_eq!(event.ts_epoch_ms(), 42);
    }
}
