//! Signed session tokens (HS256). The token binds account id and role so a
//! resource-protecting caller can verify it without a store round-trip.

use crate::store::Role;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 3600;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session token expired")]
    Expired,
    #[error("invalid session token")]
    Invalid,
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(secret: &SecretString, ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            ttl_seconds,
        }
    }

    /// Issue a token for `account_id` expiring `ttl_seconds` from now.
    ///
    /// # Errors
    /// Returns [`SessionError::Invalid`] if encoding fails.
    pub fn issue(&self, account_id: Uuid, role: Role) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.ttl_seconds)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify a token and return the identity it binds.
    ///
    /// # Errors
    /// [`SessionError::Expired`] for a stale token, [`SessionError::Invalid`]
    /// for a bad signature or malformed token.
    pub fn verify(&self, token: &str) -> Result<(Uuid, Role), SessionError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        let account_id = Uuid::parse_str(&data.claims.sub).map_err(|_| SessionError::Invalid)?;
        Ok((account_id, data.claims.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(ttl_seconds: i64) -> SessionIssuer {
        SessionIssuer::new(
            &SecretString::from("test-secret-at-least-32-bytes-long!"),
            ttl_seconds,
        )
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let issuer = issuer(60);
        let account_id = Uuid::new_v4();
        let token = issuer.issue(account_id, Role::Admin).unwrap();

        let (verified_id, role) = issuer.verify(&token).unwrap();
        assert_eq!(verified_id, account_id);
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = issuer(60).issue(Uuid::new_v4(), Role::User).unwrap();
        let other = SessionIssuer::new(&SecretString::from("another-secret-entirely-here!!"), 60);
        assert_eq!(other.verify(&token), Err(SessionError::Invalid));
    }

    #[test]
    fn stale_token_is_expired() {
        let token = issuer(-60).issue(Uuid::new_v4(), Role::User).unwrap();
        assert_eq!(issuer(60).verify(&token), Err(SessionError::Expired));
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(
            issuer(60).verify("not.a.token"),
            Err(SessionError::Invalid)
        );
    }
}
