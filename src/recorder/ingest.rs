//! Wire-message ingest.
//!
//! Parses the JSON payloads posted by the injected capture script into
//! [`Event`]s, applying the session's capture filters and the wire snippet
//! limits. Fail-open throughout: malformed or unknown messages are dropped
//! with a warning, never an error - one bad payload must not break a capture
//! session.

use serde_json::Value;

use crate::model::event::Event;
use crate::model::ids;
use crate::model::records::CaptureFilters;

/// Wire limit for request body snippets (characters).
const REQUEST_SNIPPET_MAX: usize = 1000;
/// Wire limit for response body snippets (characters).
const RESPONSE_SNIPPET_MAX: usize = 10_000;
/// Wire limit for click text snippets (characters).
const CLICK_TEXT_MAX: usize = 100;

/// Parse one capture-script message into an event.
///
/// Dispatches on the `type` field (`NET_REQ`, `NET_RES`, `CLICK`). Requests
/// for hosts outside the allowlist are dropped entirely; response bodies of
/// disallowed content types are dropped while the response event itself is
/// kept. Missing fields default (`GET`, status 0, empty strings); a missing
/// request call id is generated.
pub fn parse_wire_message(
    message: &str,
    ts_epoch_ms: i64,
    filters: &CaptureFilters,
) -> Option<Event> {
    let value: Value = match serde_json::from_str(message) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("WIRE_PARSE_FAILED error={}", e);
            return None;
        }
    };
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            log::warn!("WIRE_PARSE_FAILED error=non-object payload");
            return None;
        }
    };
    let msg_type = obj.get("type").and_then(Value::as_str)?;

    match msg_type {
        "NET_REQ" => {
            let url = str_field(obj, "url").unwrap_or_default();
            if !filters.allows_host(&url) {
                log::debug!("WIRE_HOST_FILTERED url={}", url);
                return None;
            }
            Some(Event::NetworkRequest {
                ts_epoch_ms,
                call_id: str_field(obj, "callId").unwrap_or_else(ids::call_id),
                method: str_field(obj, "method").unwrap_or_else(|| "GET".to_string()),
                url,
                headers: Default::default(),
                body_snippet: str_field(obj, "body").map(|b| clip(&b, REQUEST_SNIPPET_MAX)),
            })
        }
        "NET_RES" => {
            let content_type = str_field(obj, "contentType");
            let body_allowed = content_type
                .as_deref()
                .map(|ct| filters.allows_content_type(ct))
                .unwrap_or(false);
            let limit = RESPONSE_SNIPPET_MAX.min(filters.max_body_bytes);
            Some(Event::NetworkResponse {
                ts_epoch_ms,
                call_id: str_field(obj, "callId").unwrap_or_default(),
                status: int_field(obj, "status").unwrap_or(0),
                headers: Default::default(),
                body_snippet: if body_allowed {
                    str_field(obj, "body").map(|b| clip(&b, limit))
                } else {
                    None
                },
                content_type,
            })
        }
        "CLICK" => Some(Event::Click {
            ts_epoch_ms,
            css_path: str_field(obj, "cssPath").unwrap_or_default(),
            text_snippet: str_field(obj, "text").map(|t| clip(&t, CLICK_TEXT_MAX)),
        }),
        other => {
            log::warn!("WIRE_UNKNOWN_TYPE type={}", other);
            None
        }
    }
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Numeric field that may arrive as a JSON number or a numeric string.
fn int_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<u16> {
    let value = obj.get(key)?;
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn clip(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
