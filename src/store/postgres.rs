//! Postgres-backed [`AccountStore`] on `sqlx`. The unique index on
//! `accounts.email` is the source of truth for registration races; SQLSTATE
//! 23505 surfaces as [`StoreError::DuplicateEmail`].

use super::{Account, AccountPatch, AccountStore, ResetToken, Role, StoreError};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};
use tracing::{Instrument, info_span};
use uuid::Uuid;

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a small pool and make sure the schema exists.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable or the schema cannot
    /// be applied.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(dsn)
            .await
            .context("failed to connect to database")?;

        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&pool)
            .await
            .context("failed to apply schema")?;

        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &PgRow) -> Result<Account> {
    let role: String = row.get("role");
    let role = Role::parse(&role).ok_or_else(|| anyhow!("unknown role in store: {role}"))?;
    Ok(Account {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        role,
        verified: row.get("verified"),
        avatar: row.get("avatar"),
        created_at: row.get("created_at"),
    })
}

fn reset_token_from_row(row: &PgRow) -> ResetToken {
    ResetToken {
        email: row.get("email"),
        token: row.get("token"),
        expires_at: row.get("expires_at"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, email, first_name, last_name, password_hash, role, verified, avatar, created_at";

#[async_trait]
impl AccountStore for PgStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up account by email")?;

        row.as_ref().map(account_from_row).transpose().map_err(Into::into)
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up account by id")?;

        row.as_ref().map(account_from_row).transpose().map_err(Into::into)
    }

    async fn create_account(&self, account: Account) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO accounts
                (id, email, first_name, last_name, password_hash, role, verified, avatar, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ";
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "INSERT");
        let result = sqlx::query(query)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .bind(account.verified)
            .bind(&account.avatar)
            .bind(account.created_at)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateEmail),
            Err(err) => Err(StoreError::Backend(
                anyhow::Error::new(err).context("failed to insert account"),
            )),
        }
    }

    async fn update_account(&self, id: Uuid, patch: AccountPatch) -> Result<bool, StoreError> {
        let query = r"
            UPDATE accounts
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                avatar = COALESCE($4, avatar),
                verified = COALESCE($5, verified),
                password_hash = COALESCE($6, password_hash)
            WHERE id = $1
        ";
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "UPDATE");
        let result = sqlx::query(query)
            .bind(id)
            .bind(&patch.first_name)
            .bind(&patch.last_name)
            .bind(&patch.avatar)
            .bind(patch.verified)
            .bind(&patch.password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update account")?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_reset_token(&self, token: &str) -> Result<Option<ResetToken>, StoreError> {
        let query = "SELECT email, token, expires_at FROM password_reset_tokens WHERE token = $1";
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
        let row = sqlx::query(query)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up reset token")?;

        Ok(row.as_ref().map(reset_token_from_row))
    }

    async fn find_reset_token_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ResetToken>, StoreError> {
        let query = "SELECT email, token, expires_at FROM password_reset_tokens WHERE email = $1";
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up reset token by email")?;

        Ok(row.as_ref().map(reset_token_from_row))
    }

    async fn create_reset_token(&self, token: ResetToken) -> Result<(), StoreError> {
        // Last-writer-wins on the email key; a concurrent request for the
        // same email leaves exactly one live token either way.
        let query = r"
            INSERT INTO password_reset_tokens (email, token, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (email)
            DO UPDATE SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at
        ";
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "INSERT");
        sqlx::query(query)
            .bind(&token.email)
            .bind(&token.token)
            .bind(token.expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert reset token")?;

        Ok(())
    }

    async fn update_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let query =
            "UPDATE password_reset_tokens SET token = $2, expires_at = $3 WHERE email = $1";
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "UPDATE");
        let result = sqlx::query(query)
            .bind(email)
            .bind(token)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update reset token")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_reset_token(&self, token: &str) -> Result<bool, StoreError> {
        let query = "DELETE FROM password_reset_tokens WHERE token = $1";
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "DELETE");
        let result = sqlx::query(query)
            .bind(token)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete reset token")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_both_tables() {
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS accounts"));
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS password_reset_tokens"));
        // email uniqueness is the invariant registration relies on
        assert!(SCHEMA_SQL.contains("email TEXT NOT NULL UNIQUE"));
    }
}
