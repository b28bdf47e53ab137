//! Shared error types for the Keepsake system.

use thiserror::Error;

/// Top-level error type for the Keepsake system.
#[derive(Error, Debug)]
pub enum KeepsakeError {
    /// A request carried invalid or missing fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested record was not found (or is soft-deleted).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A supersession request was rejected by the lifecycle rules.
    #[error("Supersession rejected: {0}")]
    Supersession(#[from] SupersessionError),

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Alias for Result with KeepsakeError.
pub type KeepsakeResult<T> = Result<T, KeepsakeError>;

/// Rejection reasons for a supersession request.
///
/// Each reason carries a stable machine-readable code that survives
/// serialization boundaries; clients branch on the code, not the message.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupersessionError {
    /// A record cannot supersede itself.
    #[error("a record cannot supersede itself")]
    SelfSupersession,

    /// The record doing the superseding does not exist or is deleted.
    #[error("superseding record does not exist")]
    SupersedingNotFound,

    /// The record being superseded does not exist or is deleted.
    #[error("target record does not exist")]
    TargetNotFound,

    /// The record doing the superseding has itself been superseded.
    #[error("superseding record is itself superseded")]
    SupersedingIsSuperseded,

    /// The target was already superseded by an earlier request.
    #[error("target record is already superseded")]
    TargetAlreadySuperseded,

    /// The two records already supersede each other in some direction.
    #[error("supersession would form a cycle")]
    CircularSupersession,
}

impl SupersessionError {
    /// Stable machine-readable code for this rejection.
    pub fn code(&self) -> &'static str {
        match self {
            SupersessionError::SelfSupersession => "SELF_SUPERSESSION",
            SupersessionError::SupersedingNotFound => "SUPERSEDING_NOT_FOUND",
            SupersessionError::TargetNotFound => "TARGET_NOT_FOUND",
            SupersessionError::SupersedingIsSuperseded => "SUPERSEDING_IS_SUPERSEDED",
            SupersessionError::TargetAlreadySuperseded => "TARGET_ALREADY_SUPERSEDED",
            SupersessionError::CircularSupersession => "CIRCULAR_SUPERSESSION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supersession_codes_are_stable() {
        let cases = [
            (SupersessionError::SelfSupersession, "SELF_SUPERSESSION"),
            (SupersessionError::SupersedingNotFound, "SUPERSEDING_NOT_FOUND"),
            (SupersessionError::TargetNotFound, "TARGET_NOT_FOUND"),
            (
                SupersessionError::SupersedingIsSuperseded,
                "SUPERSEDING_IS_SUPERSEDED",
            ),
            (
                SupersessionError::TargetAlreadySuperseded,
                "TARGET_ALREADY_SUPERSEDED",
            ),
            (SupersessionError::CircularSupersession, "CIRCULAR_SUPERSESSION"),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn supersession_wraps_into_top_level_error() {
        let err: KeepsakeError = SupersessionError::SelfSupersession.into();
        assert!(err.to_string().contains("cannot supersede itself"));
    }
}
