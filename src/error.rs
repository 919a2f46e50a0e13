//! Error types for the queue engine.
//!
//! Only [`EngineError::EmptyCatalog`], [`EngineError::UnknownTrack`],
//! [`EngineError::InvalidContext`] and [`EngineError::NoActiveTrack`] ever
//! reach a caller. The other two variants are produced by inner helpers and
//! absorbed where they are raised: a short history leaves the behavior
//! profile untouched, and a missing replacement simply means nothing is
//! injected into the queue.

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No tracks are available to score
    #[error("no catalog loaded: there are no tracks to score")]
    EmptyCatalog,

    /// Fewer listening events than needed to recompute the behavior profile
    #[error("insufficient listening history: {have} events, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    /// No catalog track satisfies the similarity bound for an injection
    #[error("no eligible replacement track: {reason}")]
    NoEligibleReplacement { reason: String },

    /// A track id that is not part of the catalog
    #[error("unknown track id: {0}")]
    UnknownTrack(String),

    /// A context label that does not name a known weather, activity or time
    #[error("invalid context value: {0}")]
    InvalidContext(String),

    /// A playback command was issued with nothing queued to play
    #[error("no track is currently active")]
    NoActiveTrack,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_readable() {
        assert_eq!(
            EngineError::EmptyCatalog.to_string(),
            "no catalog loaded: there are no tracks to score"
        );
        assert_eq!(
            EngineError::InsufficientHistory { have: 3, need: 5 }.to_string(),
            "insufficient listening history: 3 events, need 5"
        );
        assert!(EngineError::UnknownTrack("abc".into()).to_string().contains("abc"));
    }

    #[test]
    fn test_converts_into_anyhow() {
        let err: anyhow::Error = EngineError::NoActiveTrack.into();
        assert!(err.downcast_ref::<EngineError>().is_some());
    }
}
