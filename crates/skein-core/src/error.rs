use thiserror::Error;

use crate::domain::JobStatus;

/// Errors surfaced by the queue core and its collaborators.
///
/// Nothing inside the core swallows these: a failing collaborator call
/// surfaces to whoever drove the `Queue` operation.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The adapter does not implement the requested capability
    /// (e.g. pushing into a listen-only backend).
    #[error("adapter does not support {behavior}")]
    BehaviorNotSupported { behavior: &'static str },

    #[error("unknown message id: {0}")]
    UnknownId(String),

    #[error("message already has id {current}, refusing to assign {requested}")]
    IdAlreadyAssigned { current: String, requested: String },

    #[error("unresolvable middleware definition: {0}")]
    UnresolvableDefinition(String),

    #[error("duplicate middleware name={0}")]
    DuplicateMiddleware(String),

    #[error("handler not found for message name={0}")]
    HandlerNotFound(String),

    #[error("duplicate handler for message name={0}")]
    DuplicateHandler(String),

    #[error("handler for {name} failed: {reason}")]
    Handler { name: String, reason: String },

    /// An event listener refused the operation.
    #[error("vetoed: {0}")]
    Vetoed(String),

    #[error("invalid status transition {from:?} -> {to:?}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("{0}")]
    Other(String),
}

impl QueueError {
    pub fn not_supported(behavior: &'static str) -> Self {
        Self::BehaviorNotSupported { behavior }
    }

    pub fn handler(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Handler {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
