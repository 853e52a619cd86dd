//! Recording orchestration: session lifecycle and wire-message ingest.

pub mod controller;
pub mod ingest;
