//! Error taxonomy for the adaptive assessment engine.
//!
//! Pure functions (the IRT kernel, ranker, selector, composer) never fail except
//! via [`IidpError::Precondition`], which is reserved for malformed inputs that
//! indicate a programmer error rather than a runtime condition. Repository
//! operations are the only source of [`IidpError::TransientIo`] and
//! [`IidpError::Conflict`]; the engine wraps those with retry/backoff before
//! they bubble up.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IidpError {
    /// Learner, item, or profile does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A response referenced an unknown item, or IRT parameters were malformed.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// No items matched even after relaxing every selector constraint.
    /// Handled locally: callers get a shorter quiz with a warning, never this
    /// error directly, unless every slot failed.
    #[error("insufficient candidates to fill quiz slot")]
    InsufficientCandidates,

    /// Concurrent write to the same learner's profile.
    #[error("conflicting write for learner {0}")]
    Conflict(String),

    /// Repository I/O hiccup, retried with bounded backoff before surfacing.
    #[error("transient I/O error: {0}")]
    TransientIo(String),

    /// The caller's deadline elapsed before persistence; no partial state was written.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl IidpError {
    /// Whether this error is worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IidpError::Conflict(_) | IidpError::TransientIo(_))
    }
}

pub type Result<T> = std::result::Result<T, IidpError>;
