//! Stable identities for pages and calls.

pub mod signature;
