//! Export: redacted bundle assembly and the filesystem bundle writer.

pub mod bundle;
pub mod store;
