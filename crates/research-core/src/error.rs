//! Error types for the research workflow
//!
//! Every variant aborts the current workflow instance. Nothing here is
//! retried automatically; the confirmation loop is the only repetition and
//! it is driven by the human, never by error recovery.

use std::time::Duration;

/// Main workflow error type
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// Malformed or empty initial input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Generation backend returned data not matching the expected shape
    #[error("generation schema error: {0}")]
    GenerationSchema(String),

    /// Free-text generation produced nothing
    #[error("generation produced an empty result")]
    GenerationEmptyResult,

    /// Caller bug: an operation was invoked outside its contract
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// Workflow aborted while suspended
    #[error("workflow cancelled: {0}")]
    Cancelled(CancelReason),

    /// Too many revision rounds without approval
    #[error("revision limit exceeded ({limit} revisions)")]
    RevisionLimitExceeded { limit: usize },

    /// Generation backend failed (transport, provider, auth)
    #[error("generation failed: {0}")]
    Generation(String),

    /// Human interaction channel failed
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl ResearchError {
    /// Check if the workflow was cancelled (signal or timeout)
    #[inline]
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Check if the error indicates a caller bug rather than a runtime condition
    #[inline]
    #[must_use]
    pub fn is_caller_bug(&self) -> bool {
        matches!(self, Self::PreconditionViolation(_))
    }

    /// Terse message shown to the human when the workflow aborts
    #[must_use]
    pub fn abort_message(&self) -> String {
        match self {
            Self::Cancelled(reason) => format!("Research aborted: {reason}."),
            Self::RevisionLimitExceeded { limit } => {
                format!("Research aborted: no approval after {limit} revisions.")
            }
            other => format!("Research aborted: {other}."),
        }
    }
}

impl From<GenerationError> for ResearchError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Schema(msg) => Self::GenerationSchema(msg),
            GenerationError::Backend(msg) => Self::Generation(msg),
        }
    }
}

/// Why a workflow was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Cancellation signal delivered by the caller
    Signal,
    /// A suspension point outlived its timeout
    Timeout(Duration),
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signal => write!(f, "cancellation requested"),
            Self::Timeout(d) => write!(f, "timed out after {}s", d.as_secs()),
        }
    }
}

/// Errors raised by a generation backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Output does not conform to the requested schema
    #[error("schema mismatch: {0}")]
    Schema(String),

    /// Backend unreachable or returned a failure
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors raised by the human interaction channel
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Input stream closed before an answer arrived
    #[error("input closed")]
    InputClosed,

    /// IO failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
