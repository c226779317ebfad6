//! Failure taxonomy for a single poll cycle.
//!
//! Every failure is absorbed at the cycle boundary; only `PermissionDenied`
//! ends the run.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CycleError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location request timed out")]
    LocationTimeout,

    #[error("Location provider returned no fix")]
    LocationNullResult,

    #[error("Location provider error: {0}")]
    Location(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Malformed weather response: {0}")]
    MalformedResponse(String),
}

impl CycleError {
    /// Whether the next poll iteration may succeed where this one failed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::PermissionDenied)
    }
}
