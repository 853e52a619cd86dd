//! The navigation map: node/edge store and the auto-mapping engine.

pub mod engine;
pub mod map;
