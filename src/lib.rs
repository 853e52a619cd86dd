//! navmap-core - Session recording and navigation auto-mapping engine
//!
//! This crate is the recording core of the study-cockpit tooling: it takes a
//! stream of timestamped browser events (navigation, network request/response,
//! click) captured by an embedded web view, deduplicates visited pages into a
//! graph of chain points keyed by content-derived signatures, infers
//! parent/child navigation edges with a rule-based policy, derives flat JSON
//! schemas from captured response bodies, and redacts sensitive tokens before
//! export.
//!
//! The implementation prioritizes:
//!
//! 1. **Capture safety** - malformed input never aborts a recording session;
//!    every JSON-touching path fails open
//! 2. **Logging** - every mapping decision logged with session/chain context
//! 3. **Determinism** - signatures, graph iteration, and export output are
//!    stable across runs
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `model` - events, sessions, chains, graph records, id generation
//! - `identity` - URL normalization and dedup signatures
//! - `security` - redaction of headers, bodies, and query strings
//! - `schema` - flat field-schema inference over JSON documents
//! - `graph` - the chain-point graph store and the auto-mapping engine
//! - `export` - redacted bundle assembly and the filesystem bundle writer
//! - `recorder` - session lifecycle orchestration and wire-message ingest
//! - `logging` - structured logging with session/chain context
//!
//! The core is single-threaded and synchronous: exactly one producer (the
//! embedded browser's event bridge) is expected to feed events sequentially.
//! Hosts with concurrent event sources must serialize access to
//! [`RecorderController`] themselves.

pub mod export;
pub mod graph;
pub mod identity;
pub mod logging;
pub mod model;
pub mod recorder;
pub mod schema;
pub mod security;

pub use export::bundle::{BundleContent, ExportError};
pub use export::store::{BundleStore, StoreError};
pub use graph::engine::{AutoMappingEngine, ParentInference};
pub use graph::map::{GraphMetadata, MapGraph};
pub use model::event::{Event, Phase};
pub use model::records::{
    CaptureFilters, ChainEdge, ChainPoint, CreatedBy, EdgeReason, HttpCall, RecordChain,
    RecordingSession,
};
pub use recorder::controller::RecorderController;
pub use schema::derive::FieldSchema;
