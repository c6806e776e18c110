//! Error types for Mindset Credit

use thiserror::Error;

/// Errors that can occur while scoring an applicant
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid candidate batch: {0}")]
    InvalidCandidateBatch(String),

    #[error("Invalid behavioral signal bundle: {0}")]
    InvalidBundle(String),

    #[error("Invalid scoring configuration: {0}")]
    InvalidConfig(String),

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Out-of-order response: expected sequence index {expected}, got {actual}")]
    OutOfOrderResponse { expected: usize, actual: usize },

    #[error("Response belongs to session {actual}, expected {expected}")]
    SessionMismatch { expected: String, actual: String },
}
