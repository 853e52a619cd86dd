//! Id generation for recording entities.
//!
//! Ids are `<prefix>_<epoch_ms>_<8 hex chars>`. The timestamp component makes
//! collisions unlikely and keeps lexicographic order close to creation order,
//! but ids are only locally unique - do not rely on them across app instances.

use chrono::Utc;
use uuid::Uuid;

pub type ChainId = String;
pub type NodeId = String;
pub type EdgeId = String;
pub type SessionId = String;
pub type CallId = String;

fn new_id(prefix: &str) -> String {
    let ts = Utc::now().timestamp_millis();
    let rand = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, ts, &rand[..8])
}

pub fn chain_id() -> ChainId {
    new_id("chain")
}

pub fn node_id() -> NodeId {
    new_id("node")
}

pub fn edge_id() -> EdgeId {
    new_id("edge")
}

pub fn session_id() -> SessionId {
    new_id("sess")
}

pub fn call_id() -> CallId {
    new_id("call")
}
