//! Structured logging utilities.
//!
//! Provides context-aware logging with session_id and chain_id included
//! in every log message.

use std::fmt;

/// Logging context for a recording session.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub session_id: String,
    pub chain_id: Option<String>,
}

impl LogContext {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            chain_id: None,
        }
    }

    pub fn with_chain(&self, chain_id: &str) -> Self {
        Self {
            session_id: self.session_id.clone(),
            chain_id: Some(chain_id.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.chain_id {
            Some(cid) => write!(f, "[session={}] [chain={}]", self.session_id, cid),
            None => write!(f, "[session={}]", self.session_id),
        }
    }
}
