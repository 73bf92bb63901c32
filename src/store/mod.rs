//! Account and reset-token persistence.
//!
//! The orchestrator talks to storage exclusively through [`AccountStore`];
//! every implementation must provide per-record atomicity and enforce the
//! unique index on `email`. The uniqueness constraint of the backing store,
//! not the orchestrator's pre-check, decides races between concurrent
//! registrations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

/// Avatar assigned to accounts created without one.
pub const DEFAULT_AVATAR_URL: &str = "https://cdn.chiave.dev/assets/avatar-placeholder.png";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// A stored account. `password_hash` is the only credential material and is
/// stripped before anything leaves the orchestrator.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
    pub verified: bool,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating an account. Id, avatar, verified flag and
/// creation timestamp are assigned by [`Account::create`].
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
}

impl Account {
    /// Materialize a new unverified account with a fresh id.
    #[must_use]
    pub fn create(new: NewAccount) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            password_hash: new.password_hash,
            role: new.role,
            verified: false,
            avatar: DEFAULT_AVATAR_URL.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Partial update of the mutable, non-identity account fields. `None` leaves
/// a field unchanged. Email, id, role and creation timestamp cannot be
/// patched.
#[derive(Clone, Debug, Default)]
pub struct AccountPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
    pub verified: Option<bool>,
    pub password_hash: Option<String>,
}

/// Live password-reset token. At most one row per email exists at any time.
#[derive(Clone, Debug)]
pub struct ResetToken {
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("an account with this email already exists")]
    DuplicateEmail,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Repository contract consumed by the orchestrator. All operations are
/// atomic at the single-record level; none span records transactionally.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Persist a new account. Fails with [`StoreError::DuplicateEmail`] when
    /// the unique email constraint rejects the insert.
    async fn create_account(&self, account: Account) -> Result<(), StoreError>;

    /// Apply `patch` to the account with `id`. Returns `false` when no such
    /// account exists.
    async fn update_account(&self, id: Uuid, patch: AccountPatch) -> Result<bool, StoreError>;

    async fn find_reset_token(&self, token: &str) -> Result<Option<ResetToken>, StoreError>;

    async fn find_reset_token_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ResetToken>, StoreError>;

    /// Insert a reset token for an email that has none. Concurrent creates
    /// for the same email resolve last-writer-wins.
    async fn create_reset_token(&self, token: ResetToken) -> Result<(), StoreError>;

    /// Replace token and expiry of the existing row for `email`. Returns
    /// `false` when no row exists.
    async fn update_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Remove a consumed token. Returns `false` when the token was already
    /// gone.
    async fn delete_reset_token(&self, token: &str) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);
    }

    #[test]
    fn create_assigns_defaults() {
        let account = Account::create(NewAccount {
            email: "a@example.com".to_string(),
            first_name: None,
            last_name: None,
            password_hash: None,
            role: Role::User,
        });

        assert!(!account.verified);
        assert_eq!(account.avatar, DEFAULT_AVATAR_URL);
        assert!(account.password_hash.is_none());
    }
}
