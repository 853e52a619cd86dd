//! URL normalization and dedup signatures.
//!
//! A signature is a normalized string identity for a page visit, combining
//! its URL with the API operations observed during that visit. Two URLs that
//! differ only in volatile query parameters (or parameter order) must produce
//! the same signature - this is what makes graph deduplication work.

use std::collections::HashSet;

use lazy_static::lazy_static;
use serde_json::Value;

lazy_static! {
    /// Query parameters dropped during normalization: OAuth redirect noise
    /// and cache busters.
    static ref VOLATILE_PARAMS: HashSet<&'static str> =
        ["code", "state", "nonce", "session_state", "t", "_"]
            .into_iter()
            .collect();
}

/// Normalize a URL for signature computation.
///
/// Strips the fragment, drops volatile query parameters, and sorts the
/// remaining parameters lexicographically by key. The `?` is omitted entirely
/// when no parameters survive.
pub fn normalize_url(url: &str) -> String {
    let no_fragment = match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    };
    let q_idx = match no_fragment.find('?') {
        Some(idx) => idx,
        None => return no_fragment.to_string(),
    };
    let base = &no_fragment[..q_idx];
    let query = &no_fragment[q_idx + 1..];

    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|p| !p.trim().is_empty())
        .filter_map(|p| p.find('=').map(|eq| (&p[..eq], &p[eq + 1..])))
        .filter(|(key, _)| !VOLATILE_PARAMS.contains(key))
        .collect();
    params.sort_by(|a, b| a.0.cmp(b.0));

    if params.is_empty() {
        base.to_string()
    } else {
        let joined = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", base, joined)
    }
}

/// Compute the dedup signature for a navigation, folding in the GraphQL
/// operation names and Moodle AJAX method names observed during the same
/// navigation window.
pub fn compute_node_signature(url: &str, graphql_ops: &[String], ajax_methods: &[String]) -> String {
    let normalized = normalize_url(url);
    let mut ops = graphql_ops.to_vec();
    ops.sort();
    let mut methods = ajax_methods.to_vec();
    methods.sort();
    format!(
        "url:{}|gql:{}|ajax:{}",
        normalized,
        ops.join(","),
        methods.join(",")
    )
}

/// Per-call signature, available for call-level deduplication.
pub fn compute_call_signature(
    url: &str,
    method: &str,
    content_type: Option<&str>,
    op_name: Option<&str>,
    ajax_method: Option<&str>,
) -> String {
    let normalized = normalize_url(url);
    format!(
        "call:{}:{}|ct:{}|op:{}|ajax:{}",
        method,
        normalized,
        content_type.unwrap_or(""),
        op_name.unwrap_or(""),
        ajax_method.unwrap_or("")
    )
}

/// Best-effort extraction of the top-level `operationName` field from a
/// GraphQL request/response body. Returns `None` on parse failure, a
/// non-object document, or an absent/non-string field - never fails.
pub fn extract_graphql_operation_name(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("operationName")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Best-effort extraction of the top-level `methodname` field from a Moodle
/// AJAX body. Same fail-open contract as
/// [`extract_graphql_operation_name`].
pub fn extract_moodle_ajax_method(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("methodname")
        .and_then(Value::as_str)
        .map(str::to_string)
}
