use thiserror::Error;

use crate::state::TransitionError;

/// Errors raised by the commerce lifecycle engine.
#[derive(Debug, Error)]
pub enum CommerceError {
    #[error(transparent)]
    Core(#[from] dyntable_core::Error),
    #[error("illegal state transition: {0}")]
    Transition(#[from] TransitionError),
}

/// Result type for commerce operations.
pub type Result<T> = std::result::Result<T, CommerceError>;
