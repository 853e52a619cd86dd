//! Redaction of sensitive data from captured sessions.
//!
//! Produces export-safe copies of sessions: credentials and
//! identity-correlating values are replaced with a placeholder without losing
//! structural information. All functions are pure and fail open - malformed
//! JSON passes through unchanged so a truncated body can never break export.

use std::collections::{BTreeMap, HashSet};

use lazy_static::lazy_static;
use serde_json::Value;

use crate::model::event::Event;
use crate::model::records::{HttpCall, RecordingSession};

/// Placeholder substituted for redacted values.
pub const REDACTED: &str = "<redacted>";

lazy_static! {
    /// Headers whose values carry credentials (matched case-insensitively).
    static ref SENSITIVE_HEADER_KEYS: HashSet<&'static str> =
        ["authorization", "cookie", "set-cookie"].into_iter().collect();

    /// JSON keys whose values are replaced at every nesting depth.
    static ref SENSITIVE_JSON_KEYS: HashSet<&'static str> = [
        "access_token",
        "refresh_token",
        "id_token",
        "code",
        "state",
        "nonce",
        "session_state",
    ]
    .into_iter()
    .collect();

    /// Query parameters whose values are replaced (OAuth redirect noise).
    static ref SENSITIVE_QUERY_PARAMS: HashSet<&'static str> =
        ["code", "state", "nonce", "session_state"].into_iter().collect();
}

/// Replace the values of sensitive headers, leaving all others unchanged.
pub fn redact_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(key, value)| {
            let value = if SENSITIVE_HEADER_KEYS.contains(key.to_lowercase().as_str()) {
                REDACTED.to_string()
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

/// Replace the values of sensitive keys in a JSON document at every nesting
/// depth, preserving structure. Input that does not parse as JSON is returned
/// unchanged.
pub fn redact_json_keys(json_string: &str) -> String {
    match serde_json::from_str::<Value>(json_string) {
        Ok(value) => {
            let redacted = redact_json_value(&value);
            // Re-serializing our own Value cannot fail.
            serde_json::to_string(&redacted).unwrap_or_else(|_| json_string.to_string())
        }
        Err(_) => json_string.to_string(),
    }
}

fn redact_json_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let redacted = map
                .iter()
                .map(|(key, val)| {
                    if SENSITIVE_JSON_KEYS.contains(key.as_str()) {
                        (key.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (key.clone(), redact_json_value(val))
                    }
                })
                .collect();
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_json_value).collect()),
        other => other.clone(),
    }
}

/// Replace the values of sensitive query parameters, keeping keys, order, and
/// everything else intact.
pub fn redact_url_query(url: &str) -> String {
    let q_idx = match url.find('?') {
        Some(idx) => idx,
        None => return url.to_string(),
    };
    let base = &url[..q_idx];
    let query = &url[q_idx + 1..];

    let redacted = query
        .split('&')
        .map(|param| match param.find('=') {
            Some(eq) => {
                let key = &param[..eq];
                if SENSITIVE_QUERY_PARAMS.contains(key) {
                    format!("{}={}", key, REDACTED)
                } else {
                    param.to_string()
                }
            }
            None => param.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", base, redacted)
}

/// Produce an export-safe copy of a session.
///
/// A no-op (clone) when the session's capture filters have `redact` disabled.
/// Otherwise every network-bearing event and every reconstructed call gets
/// its headers, bodies, and URL redacted; non-network events pass through
/// untouched. The input session is never mutated.
pub fn redact_session(session: &RecordingSession) -> RecordingSession {
    if !session.filters.redact {
        return session.clone();
    }

    let events = session
        .events
        .iter()
        .map(|event| match event {
            Event::NetworkRequest {
                ts_epoch_ms,
                call_id,
                method,
                url,
                headers,
                body_snippet,
            } => Event::NetworkRequest {
                ts_epoch_ms: *ts_epoch_ms,
                call_id: call_id.clone(),
                method: method.clone(),
                url: redact_url_query(url),
                headers: redact_headers(headers),
                body_snippet: body_snippet.as_deref().map(redact_json_keys),
            },
            Event::NetworkResponse {
                ts_epoch_ms,
                call_id,
                status,
                headers,
                body_snippet,
                content_type,
            } => Event::NetworkResponse {
                ts_epoch_ms: *ts_epoch_ms,
                call_id: call_id.clone(),
                status: *status,
                headers: redact_headers(headers),
                body_snippet: body_snippet.as_deref().map(redact_json_keys),
                content_type: content_type.clone(),
            },
            Event::Navigation {
                ts_epoch_ms,
                url,
                phase,
            } => Event::Navigation {
                ts_epoch_ms: *ts_epoch_ms,
                url: redact_url_query(url),
                phase: *phase,
            },
            other => other.clone(),
        })
        .collect();

    let calls = session
        .calls
        .iter()
        .map(|call| HttpCall {
            url: redact_url_query(&call.url),
            request_headers: redact_headers(&call.request_headers),
            response_headers: redact_headers(&call.response_headers),
            request_body: call.request_body.as_deref().map(redact_json_keys),
            response_body: call.response_body.as_deref().map(redact_json_keys),
            ..call.clone()
        })
        .collect();

    log::debug!(
        "[session={}] REDACT_SESSION events={} calls={}",
        session.id,
        session.events.len(),
        session.calls.len()
    );

    RecordingSession {
        events,
        calls,
        ..session.clone()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::model::event::Phase;
    use crate::model::records::CaptureFilters;

    fn session_with(redact: bool) -> RecordingSession {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer secret123".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());

        RecordingSession {
            id: "sess_1".to_string(),
            chain_id: None,
            started_at_epoch_ms: 0,
            ended_at_epoch_ms: Some(10),
            target_url: None,
            filters: CaptureFilters {
                redact,
                ..CaptureFilters::default()
            },
            events: vec![
                Event::Navigation {
                    ts_epoch_ms: 1,
                    url: "https://x/cb?code=abc&page=2".to_string(),
                    phase: Phase::Finished,
                },
                Event::NetworkRequest {
                    ts_epoch_ms: 2,
                    call_id: "call_1".to_string(),
                    method: "POST".to_string(),
                    url: "https://x/token?state=xyz".to_string(),
                    headers: headers.clone(),
                    body_snippet: Some(r#"{"access_token":"tok-1","user":"jo"}"#.to_string()),
                },
                Event::Marker {
                    ts_epoch_ms: 3,
                    name: "login-done".to_string(),
                },
            ],
            calls: vec![HttpCall {
                call_id: "call_1".to_string(),
                url: "https://x/token?state=xyz".to_string(),
                method: "POST".to_string(),
                request_headers: headers,
                request_body: Some(r#"{"access_token":"tok-1"}"#.to_string()),
                status: Some(200),
                response_headers: BTreeMap::new(),
                response_body: Some(r#"{"data":{"refresh_token":"tok-2"}}"#.to_string()),
                content_type: Some("application/json".to_string()),
                graphql_operation_name: None,
                moodle_ajax_method: None,
                started_at_epoch_ms: 2,
                completed_at_epoch_ms: Some(4),
            }],
        }
    }

    #[test]
    fn test_redact_headers_case_insensitive() {
        let mut headers = BTreeMap::new();
        headers.insert("AUTHORIZATION".to_string(), "Bearer abc".to_string());
        headers.insert("Set-Cookie".to_string(), "sid=1".to_string());
        headers.insert("Accept".to_string(), "text/html".to_string());

        let redacted = redact_headers(&headers);
        assert_eq!(redacted["AUTHORIZATION"], REDACTED);
        assert_eq!(redacted["Set-Cookie"], REDACTED);
        assert_eq!(redacted["Accept"], "text/html");
    }

    #[test]
    fn test_redact_json_keys_nested() {
        let body = r#"{"outer":{"access_token":"tok","keep":1},"list":[{"nonce":"n"}]}"#;
        let redacted = redact_json_keys(body);
        assert!(!redacted.contains("tok"));
        assert!(!redacted.contains(r#""nonce":"n""#));
        assert!(redacted.contains(r#""keep":1"#));
        assert!(redacted.contains(REDACTED));
    }

    #[test]
    fn test_redact_json_keys_malformed_passthrough() {
        assert_eq!(redact_json_keys("not json"), "not json");
        assert_eq!(redact_json_keys(""), "");
        assert_eq!(redact_json_keys("{truncated"), "{truncated");
    }

    #[test]
    fn test_redact_url_query() {
        assert_eq!(
            redact_url_query("https://x/cb?code=abc&page=2"),
            format!("https://x/cb?code={}&page=2", REDACTED)
        );
        assert_eq!(redact_url_query("https://x/plain"), "https://x/plain");
        // Bare parameters stay as-is.
        assert_eq!(
            redact_url_query("https://x/y?flag&state=s"),
            format!("https://x/y?flag&state={}", REDACTED)
        );
    }

    #[test]
    fn test_redact_session_disabled_is_identity() {
        let session = session_with(false);
        assert_eq!(redact_session(&session), session);
    }

    #[test]
    fn test_redact_session_scrubs_network_data() {
        let session = session_with(true);
        let redacted = redact_session(&session);

        let serialized = serde_json::to_string(&redacted).unwrap();
        assert!(!serialized.contains("secret123"));
        assert!(!serialized.contains("tok-1"));
        assert!(!serialized.contains("tok-2"));
        assert!(!serialized.contains("code=abc"));
        assert!(!serialized.contains("state=xyz"));
        // Non-network events untouched.
        assert!(serialized.contains("login-done"));
        // Structure preserved.
        assert_eq!(redacted.events.len(), session.events.len());
        assert_eq!(redacted.calls.len(), session.calls.len());
    }

    #[test]
    fn test_redact_session_idempotent() {
        let session = session_with(true);
        let once = redact_session(&session);
        let twice = redact_session(&once);
        assert_eq!(once, twice);
    }

    proptest! {
        #[test]
        fn prop_redact_json_keys_idempotent(input in ".{0,200}") {
            let once = redact_json_keys(&input);
            prop_assert_eq!(redact_json_keys(&once), once);
        }
    }
}
