//! Map-backed [`AccountStore`] used by the test suite and for local runs
//! without a database. A single mutex gives the same check-then-act
//! atomicity the SQL implementation gets from its unique index.

use super::{Account, AccountPatch, AccountStore, ResetToken, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    // keyed by owning email, which enforces one live token per email
    reset_tokens: HashMap<String, ResetToken>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .accounts
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.accounts.get(&id).cloned())
    }

    async fn create_account(&self, account: Account) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner
            .accounts
            .values()
            .any(|existing| existing.email == account.email)
        {
            return Err(StoreError::DuplicateEmail);
        }
        inner.accounts.insert(account.id, account);
        Ok(())
    }

    async fn update_account(&self, id: Uuid, patch: AccountPatch) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(account) = inner.accounts.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(first_name) = patch.first_name {
            account.first_name = Some(first_name);
        }
        if let Some(last_name) = patch.last_name {
            account.last_name = Some(last_name);
        }
        if let Some(avatar) = patch.avatar {
            account.avatar = avatar;
        }
        if let Some(verified) = patch.verified {
            account.verified = verified;
        }
        if let Some(password_hash) = patch.password_hash {
            account.password_hash = Some(password_hash);
        }
        Ok(true)
    }

    async fn find_reset_token(&self, token: &str) -> Result<Option<ResetToken>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .reset_tokens
            .values()
            .find(|record| record.token == token)
            .cloned())
    }

    async fn find_reset_token_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ResetToken>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.reset_tokens.get(email).cloned())
    }

    async fn create_reset_token(&self, token: ResetToken) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.reset_tokens.insert(token.email.clone(), token);
        Ok(())
    }

    async fn update_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(record) = inner.reset_tokens.get_mut(email) else {
            return Ok(false);
        };
        record.token = token.to_string();
        record.expires_at = expires_at;
        Ok(true)
    }

    async fn delete_reset_token(&self, token: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(email) = inner
            .reset_tokens
            .values()
            .find(|record| record.token == token)
            .map(|record| record.email.clone())
        else {
            return Ok(false);
        };
        inner.reset_tokens.remove(&email);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewAccount, Role};
    use chrono::Duration;

    fn account(email: &str) -> Account {
        Account::create(NewAccount {
            email: email.to_string(),
            first_name: None,
            last_name: None,
            password_hash: None,
            role: Role::User,
        })
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.create_account(account("a@example.com")).await.unwrap();

        let result = store.create_account(account("a@example.com")).await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn patch_leaves_unset_fields_alone() {
        let store = MemoryStore::new();
        let created = account("b@example.com");
        let id = created.id;
        store.create_account(created).await.unwrap();

        let patched = store
            .update_account(
                id,
                AccountPatch {
                    first_name: Some("Ada".to_string()),
                    ..AccountPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(patched);

        let account = store.find_account_by_id(id).await.unwrap().unwrap();
        assert_eq!(account.first_name.as_deref(), Some("Ada"));
        assert!(account.last_name.is_none());
        assert!(!account.verified);
    }

    #[tokio::test]
    async fn one_live_token_per_email() {
        let store = MemoryStore::new();
        let expires_at = Utc::now() + Duration::hours(1);
        store
            .create_reset_token(ResetToken {
                email: "c@example.com".to_string(),
                token: "t1".to_string(),
                expires_at,
            })
            .await
            .unwrap();
        store
            .update_reset_token("c@example.com", "t2", expires_at)
            .await
            .unwrap();

        assert!(store.find_reset_token("t1").await.unwrap().is_none());
        assert!(store.find_reset_token("t2").await.unwrap().is_some());
        let by_email = store
            .find_reset_token_by_email("c@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.token, "t2");
        assert!(store.delete_reset_token("t2").await.unwrap());
        assert!(!store.delete_reset_token("t2").await.unwrap());
    }
}
