//! Export-safety: redaction of credentials and identity-correlating values.

pub mod redaction;
