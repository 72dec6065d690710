//! Error types surfaced by the mediator service.

use thiserror::Error;

/// Mediator error type.
///
/// Provider failures never leak through this type: whatever went wrong
/// upstream, the caller only sees [`MediatorError::Unavailable`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediatorError {
    /// Malformed input, rejected before any outbound call.
    #[error("invalid mediator input: {0}")]
    Validation(String),
    /// No model produced a reply.
    #[error("mediator is unavailable")]
    Unavailable,
}

/// Convenience result alias for mediator operations.
pub type MediatorResult<T> = Result<T, MediatorError>;
