//! Failure taxonomy of the orchestrator. Every internal failure is wrapped
//! into one of these before it reaches a caller; the wire shape is always
//! [`ErrorReply`] (message + status), never a raw error chain.

use crate::store::StoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user already exists")]
    Conflict,
    #[error("user not found")]
    NotFound,
    #[error("invalid password")]
    InvalidCredentials,
    #[error("invalid reset token")]
    InvalidToken,
    #[error("reset token expired")]
    Expired,
    #[error("password confirmation does not match")]
    Mismatch,
    #[error("{0}")]
    Validation(String),
    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    /// HTTP-ish status code carried alongside the message on the bus.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Conflict => 409,
            Self::NotFound => 404,
            Self::InvalidCredentials => 401,
            Self::InvalidToken | Self::Expired | Self::Mismatch | Self::Validation(_) => 400,
            Self::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::Conflict,
            StoreError::Backend(err) => Self::Internal(err),
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// Uniform structured error surfaced to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorReply {
    pub message: String,
    pub status: u16,
}

impl From<&AuthError> for ErrorReply {
    fn from(err: &AuthError) -> Self {
        Self {
            message: err.to_string(),
            status: err.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(AuthError::Conflict.status(), 409);
        assert_eq!(AuthError::NotFound.status(), 404);
        assert_eq!(AuthError::InvalidCredentials.status(), 401);
        assert_eq!(AuthError::InvalidToken.status(), 400);
        assert_eq!(AuthError::Expired.status(), 400);
        assert_eq!(AuthError::Mismatch.status(), 400);
        assert_eq!(AuthError::Internal(anyhow!("boom")).status(), 500);
    }

    #[test]
    fn internal_errors_keep_a_generic_message() {
        let reply = ErrorReply::from(&AuthError::Internal(anyhow!("connection refused")));
        assert_eq!(reply.message, "internal server error");
        assert_eq!(reply.status, 500);
    }

    #[test]
    fn duplicate_email_maps_to_conflict() {
        let err: AuthError = StoreError::DuplicateEmail.into();
        assert!(matches!(err, AuthError::Conflict));
    }
}
