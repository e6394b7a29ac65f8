use thiserror::Error;

use crate::types::ActorId;

/// Failure taxonomy for toggle requests. Every rejected toggle carries exactly
/// one of these.
#[derive(Error, Debug)]
pub enum LikelyError {
    #[error("actor {0} cannot like/unlike itself")]
    SelfAction(ActorId),

    #[error("actor {0} not found")]
    TargetNotFound(ActorId),

    #[error("redundant toggle from {actor} to {target}")]
    Conflict { actor: ActorId, target: ActorId },

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl LikelyError {
    /// Client-side errors are final: retrying the same request yields the same result.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LikelyError::Storage(_))
    }
}

/// Result type alias for toggle operations.
pub type LikelyResult<T> = std::result::Result<T, LikelyError>;
