//! The account and credential lifecycle: registration, login, activation,
//! password reset, and profile maintenance.
//!
//! [`AuthService`] is stateless between calls; every operation loads what it
//! needs from the [`AccountStore`], computes one transition, and writes it
//! back. Notification delivery is decoupled from the success path: a mail
//! failure never rolls back or fails the operation that triggered it.

use crate::email::{Mail, MailSender, dispatch};
use crate::store::{Account, AccountPatch, AccountStore, NewAccount, ResetToken, Role};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

pub mod error;
pub mod password;
pub mod reset;
pub mod session;

pub use error::{AuthError, ErrorReply};
pub use session::SessionIssuer;

pub const DEFAULT_RESET_TTL_SECONDS: i64 = 3600;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    mail_from: String,
    reset_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String, mail_from: String) -> Self {
        Self {
            base_url,
            mail_from,
            reset_ttl_seconds: DEFAULT_RESET_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_reset_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_ttl_seconds = seconds;
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginReply {
    pub auth_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateReply {
    pub account_exists: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForgotPasswordReply {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

/// An account as returned to callers: everything except the password hash.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub verified: bool,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for Profile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            role: account.role,
            verified: account.verified,
            avatar: account.avatar,
            created_at: account.created_at,
        }
    }
}

pub struct AuthService {
    store: Arc<dyn AccountStore>,
    mailer: Arc<dyn MailSender>,
    sessions: SessionIssuer,
    config: AuthConfig,
}

impl AuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn MailSender>,
        sessions: SessionIssuer,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            sessions,
            config,
        }
    }

    /// Create a new, unverified standard-user account and queue the
    /// activation mail.
    ///
    /// # Errors
    /// `Conflict` when the email is taken, `Validation` when it is
    /// malformed.
    pub async fn register(&self, request: RegisterRequest) -> Result<Profile, AuthError> {
        if !valid_email(&request.email) {
            return Err(AuthError::Validation("invalid email".to_string()));
        }

        // Advisory pre-check; the store's unique index decides races.
        if self
            .store
            .find_account_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict);
        }

        let password_hash = match request.password.as_deref() {
            Some(plaintext) => Some(password::hash(plaintext)?),
            None => None,
        };

        let account = Account::create(NewAccount {
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            password_hash,
            role: Role::User,
        });

        self.store.create_account(account.clone()).await?;
        debug!(account_id = %account.id, "account created");

        let link = activation_link(&self.config.base_url, account.id);
        dispatch(
            &self.mailer,
            activation_mail(&self.config.mail_from, &account.email, &link),
        );

        Ok(account.into())
    }

    /// Verify credentials and issue a session token.
    ///
    /// # Errors
    /// `NotFound` for an unknown email, `InvalidCredentials` when the
    /// account has no local credential or the password does not match.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginReply, AuthError> {
        let account = self
            .store
            .find_account_by_email(&request.email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let Some(digest) = account.password_hash.as_deref() else {
            return Err(AuthError::InvalidCredentials);
        };
        if !password::verify(&request.password, digest) {
            return Err(AuthError::InvalidCredentials);
        }

        let auth_token = self
            .sessions
            .issue(account.id, account.role)
            .map_err(|err| AuthError::Internal(err.into()))?;

        Ok(LoginReply { auth_token })
    }

    /// Mark the account behind an activation link as verified. Unknown ids
    /// are not an error; the caller is asking whether the link is valid.
    ///
    /// # Errors
    /// Only on store failure.
    pub async fn activate_account(&self, account_id: Uuid) -> Result<ActivateReply, AuthError> {
        if self.store.find_account_by_id(account_id).await?.is_none() {
            return Ok(ActivateReply {
                account_exists: false,
            });
        }

        self.store
            .update_account(
                account_id,
                AccountPatch {
                    verified: Some(true),
                    ..AccountPatch::default()
                },
            )
            .await?;

        Ok(ActivateReply {
            account_exists: true,
        })
    }

    /// Issue a reset token for `email`, replacing any live one, and queue
    /// the reset mail. A second request invalidates the first token.
    ///
    /// # Errors
    /// `NotFound` for an unknown email.
    pub async fn forgot_password(&self, email: &str) -> Result<ForgotPasswordReply, AuthError> {
        let account = self
            .store
            .find_account_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let token = reset::generate()?;
        let expires_at = Utc::now() + Duration::seconds(self.config.reset_ttl_seconds);

        let replaced = self
            .store
            .update_reset_token(&account.email, &token, expires_at)
            .await?;
        if !replaced {
            self.store
                .create_reset_token(ResetToken {
                    email: account.email.clone(),
                    token: token.clone(),
                    expires_at,
                })
                .await?;
        }

        let link = reset_link(&self.config.base_url, &token);
        dispatch(
            &self.mailer,
            reset_mail(&self.config.mail_from, &account.email, &link),
        );

        Ok(ForgotPasswordReply { token })
    }

    /// Consume a reset token and replace the account's credential. The
    /// token row is deleted only after the password update lands.
    ///
    /// # Errors
    /// `InvalidToken`, `NotFound`, `Mismatch` or `Expired` per the checks
    /// below.
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), AuthError> {
        let record = self
            .store
            .find_reset_token(&request.token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let account = self
            .store
            .find_account_by_email(&record.email)
            .await?
            .ok_or(AuthError::NotFound)?;

        if request.new_password != request.confirm_password {
            return Err(AuthError::Mismatch);
        }

        if Utc::now() > record.expires_at {
            return Err(AuthError::Expired);
        }

        let digest = password::hash(&request.new_password)?;
        let updated = self
            .store
            .update_account(
                account.id,
                AccountPatch {
                    password_hash: Some(digest),
                    ..AccountPatch::default()
                },
            )
            .await?;
        if !updated {
            return Err(AuthError::NotFound);
        }

        // Only drop the token once the new credential is durable; deleting
        // first could burn the only reset attempt on a failed update.
        if !self.store.delete_reset_token(&record.token).await? {
            error!(email = %record.email, "reset token vanished before deletion");
        }

        Ok(())
    }

    /// # Errors
    /// `NotFound` for an unknown account id.
    pub async fn get_profile(&self, account_id: Uuid) -> Result<Profile, AuthError> {
        self.store
            .find_account_by_id(account_id)
            .await?
            .map(Profile::from)
            .ok_or(AuthError::NotFound)
    }

    /// Apply the supplied non-identity fields to an account.
    ///
    /// # Errors
    /// `NotFound` for an unknown account id.
    pub async fn update_profile(
        &self,
        account_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<(), AuthError> {
        let updated = self
            .store
            .update_account(
                account_id,
                AccountPatch {
                    first_name: request.first_name,
                    last_name: request.last_name,
                    avatar: request.avatar,
                    ..AccountPatch::default()
                },
            )
            .await?;

        if updated {
            Ok(())
        } else {
            Err(AuthError::NotFound)
        }
    }
}

fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

fn activation_link(base_url: &str, account_id: Uuid) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/activate-account/{account_id}")
}

fn reset_link(base_url: &str, token: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/auth/reset-password/{token}")
}

fn activation_mail(from: &str, to: &str, link: &str) -> Mail {
    Mail {
        to: to.to_string(),
        from: from.to_string(),
        subject: "Activate your account".to_string(),
        text: format!("Welcome! Activate your account by visiting {link}"),
        html: Some(format!(
            "<p>Welcome!</p><p><a href=\"{link}\">Activate your account</a></p>"
        )),
    }
}

fn reset_mail(from: &str, to: &str, link: &str) -> Mail {
    Mail {
        to: to.to_string(),
        from: from.to_string(),
        subject: "Reset your password".to_string(),
        text: format!("A password reset was requested for this address. Reset it at {link}"),
        html: Some(format!(
            "<p>A password reset was requested for this address.</p>\
             <p><a href=\"{link}\">Reset your password</a></p>"
        )),
    }
}
