//! Command surface of the service. Inbound messages carry an envelope of
//! the form `{"pattern": {"cmd": "..."}, "data": {...}, "id": "..."}`; each
//! command maps onto one orchestrator operation. Failures are serialized as
//! the uniform `{message, status}` error, never as a raw error chain.

use crate::auth::{
    AuthError, AuthService, ErrorReply, LoginRequest, RegisterRequest, ResetPasswordRequest,
    UpdateProfileRequest,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

pub mod consumer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    CreateNewUser,
    Login,
    AccountActivation,
    ForgotPassword,
    ResetPassword,
    GetProfile,
    UpdateProfile,
}

#[derive(Debug, Deserialize)]
pub struct Pattern {
    pub cmd: Command,
}

#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub pattern: Pattern,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountIdPayload {
    account_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct EmailPayload {
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfilePayload {
    account_id: Uuid,
    #[serde(flatten)]
    fields: UpdateProfileRequest,
}

/// Handle one decoded envelope and produce the reply value.
pub async fn handle(service: &AuthService, envelope: Envelope) -> Value {
    let command = envelope.pattern.cmd;
    match route(service, command, envelope.data).await {
        Ok(data) => json!({ "id": envelope.id, "data": data }),
        Err(err) => {
            debug!(?command, error = %err, "command failed");
            json!({ "id": envelope.id, "error": ErrorReply::from(&err) })
        }
    }
}

/// Reply for a message that could not be decoded at all.
#[must_use]
pub fn malformed_reply() -> Value {
    json!({
        "id": null,
        "error": ErrorReply {
            message: "malformed envelope".to_string(),
            status: 400,
        },
    })
}

async fn route(service: &AuthService, command: Command, data: Value) -> Result<Value, AuthError> {
    match command {
        Command::CreateNewUser => {
            let request: RegisterRequest = payload(data)?;
            reply(service.register(request).await?)
        }
        Command::Login => {
            let request: LoginRequest = payload(data)?;
            reply(service.login(request).await?)
        }
        Command::AccountActivation => {
            let request: AccountIdPayload = payload(data)?;
            reply(service.activate_account(request.account_id).await?)
        }
        Command::ForgotPassword => {
            let request: EmailPayload = payload(data)?;
            reply(service.forgot_password(&request.email).await?)
        }
        Command::ResetPassword => {
            let request: ResetPasswordRequest = payload(data)?;
            service.reset_password(request).await?;
            Ok(json!({}))
        }
        Command::GetProfile => {
            let request: AccountIdPayload = payload(data)?;
            reply(service.get_profile(request.account_id).await?)
        }
        Command::UpdateProfile => {
            let request: UpdateProfilePayload = payload(data)?;
            service
                .update_profile(request.account_id, request.fields)
                .await?;
            Ok(json!({}))
        }
    }
}

fn payload<T: DeserializeOwned>(data: Value) -> Result<T, AuthError> {
    serde_json::from_value(data)
        .map_err(|err| AuthError::Validation(format!("malformed payload: {err}")))
}

fn reply<T: Serialize>(value: T) -> Result<Value, AuthError> {
    serde_json::to_value(value).map_err(|err| AuthError::Internal(err.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthConfig, SessionIssuer};
    use crate::email::LogMailSender;
    use crate::store::memory::MemoryStore;
    use secrecy::SecretString;
    use std::sync::Arc;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(LogMailSender),
            SessionIssuer::new(&SecretString::from("bus-test-secret-0123456789abcdef"), 60),
            AuthConfig::new(
                "https://app.example.com".to_string(),
                "Chiave <noreply@example.com>".to_string(),
            ),
        )
    }

    fn envelope(cmd: &str, data: Value) -> Envelope {
        serde_json::from_value(json!({
            "pattern": { "cmd": cmd },
            "data": data,
            "id": "corr-1",
        }))
        .unwrap()
    }

    #[test]
    fn commands_use_their_wire_names() {
        for (name, command) in [
            ("CREATE_NEW_USER", Command::CreateNewUser),
            ("LOGIN", Command::Login),
            ("ACCOUNT_ACTIVATION", Command::AccountActivation),
            ("FORGOT_PASSWORD", Command::ForgotPassword),
            ("RESET_PASSWORD", Command::ResetPassword),
            ("GET_PROFILE", Command::GetProfile),
            ("UPDATE_PROFILE", Command::UpdateProfile),
        ] {
            let parsed: Command = serde_json::from_value(json!(name)).unwrap();
            assert_eq!(parsed, command);
        }
        assert!(serde_json::from_value::<Command>(json!("DROP_TABLES")).is_err());
    }

    #[tokio::test]
    async fn create_new_user_replies_with_profile() {
        let service = service();
        let reply = handle(
            &service,
            envelope(
                "CREATE_NEW_USER",
                json!({
                    "firstName": "Ada",
                    "email": "ada@example.com",
                    "password": "pw123456",
                }),
            ),
        )
        .await;

        assert_eq!(reply["id"], "corr-1");
        assert_eq!(reply["data"]["email"], "ada@example.com");
        assert_eq!(reply["data"]["verified"], false);
        assert!(reply["data"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let service = service();
        let register = json!({ "email": "dup@example.com", "password": "pw123456" });
        handle(&service, envelope("CREATE_NEW_USER", register.clone())).await;
        let reply = handle(&service, envelope("CREATE_NEW_USER", register)).await;

        assert_eq!(reply["error"]["status"], 409);
        assert_eq!(reply["error"]["message"], "user already exists");
    }

    #[tokio::test]
    async fn activation_for_unknown_id_is_not_an_error() {
        let service = service();
        let reply = handle(
            &service,
            envelope(
                "ACCOUNT_ACTIVATION",
                json!({ "accountId": Uuid::new_v4() }),
            ),
        )
        .await;

        assert_eq!(reply["data"]["accountExists"], false);
        assert!(reply.get("error").is_none() || reply["error"].is_null());
    }

    #[tokio::test]
    async fn malformed_payload_is_a_validation_error() {
        let service = service();
        let reply = handle(&service, envelope("LOGIN", json!({ "email": 42 }))).await;
        assert_eq!(reply["error"]["status"], 400);
    }
}
