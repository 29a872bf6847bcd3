use std::time::Duration;

use thiserror::Error;

/// Why a [`Scope`](crate::scope::Scope) stopped a unit of work.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Error, Clone)]
pub enum PlatformError {
    /// The platform rejected the credential. Fatal at startup.
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("platform request failed: {0}")]
    Transient(String),

    #[error("failed to send reply: {0}")]
    Send(String),

    #[error(transparent)]
    Scope(#[from] ScopeError),
}

impl PlatformError {
    pub fn is_auth(&self) -> bool {
        matches!(self, PlatformError::Auth(_))
    }
}

#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("failed to spawn responder '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("responder i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("responder exited with {code:?}, stderr: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("responder timed out after {0:?}")]
    Timeout(Duration),

    #[error("responder produced an empty reply")]
    EmptyReply,

    #[error("responder request failed: {0}")]
    Http(String),
}
