//! Chat engine error types.

use smartdecision_core::{Error as CoreError, ErrorKind};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while preparing, dispatching, or persisting a chat turn.
#[derive(Debug, Error)]
pub enum AiError {
    /// Invalid input or request.
    #[error("{0}")]
    InvalidInput(String),

    /// Provider name that is not known or not configured.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// The provider answered with an error status, a malformed body, or the
    /// connection failed.
    #[error("Upstream provider error (status {status:?}): {body}")]
    Upstream { status: Option<u16>, body: String },

    /// The provider did not finish in time.
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    /// The caller stopped consuming a streamed reply.
    #[error("Request cancelled")]
    Cancelled,

    /// Core error from smartdecision-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AiError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn upstream(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Caller-facing classification shared with core errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AiError::InvalidInput(_) | AiError::UnknownProvider(_) => ErrorKind::InvalidInput,
            AiError::Upstream { .. } | AiError::Timeout(_) | AiError::Cancelled => {
                ErrorKind::UpstreamFailure
            }
            AiError::Core(e) => e.kind(),
            AiError::Internal(_) => ErrorKind::StorageFailure,
        }
    }

    /// Error code for programmatic handling in responses and stream events.
    pub fn code(&self) -> &'static str {
        match self {
            AiError::InvalidInput(_) => "INVALID_INPUT",
            AiError::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            AiError::Upstream { .. } => "UPSTREAM_FAILURE",
            AiError::Timeout(_) => "TIMEOUT",
            AiError::Cancelled => "CANCELLED",
            AiError::Core(e) => e.kind().as_str(),
            AiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
