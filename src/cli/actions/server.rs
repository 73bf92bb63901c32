use crate::auth::{AuthConfig, AuthService, SessionIssuer};
use crate::bus::consumer::{self, BusConfig};
use crate::cli::telemetry;
use crate::email::{LogMailSender, MailSender, smtp::SmtpMailSender};
use crate::email::smtp::SmtpConfig;
use crate::store::postgres::PgStore;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Args {
    pub dsn: String,
    pub amqp_url: String,
    pub queue: String,
    pub base_url: String,
    pub session_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub reset_ttl_seconds: i64,
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("dsn", &self.dsn)
            .field("amqp_url", &self.amqp_url)
            .field("queue", &self.queue)
            .field("base_url", &self.base_url)
            .field("session_secret", &"***")
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("reset_ttl_seconds", &self.reset_ttl_seconds)
            .field("smtp", &self.smtp)
            .field("mail_from", &self.mail_from)
            .finish()
    }
}

/// Wire the store, mailer, session issuer, and orchestrator together and
/// consume the command queue until shutdown.
///
/// # Errors
/// Returns an error if the database or the message bus is unreachable.
pub async fn execute(args: Args) -> Result<()> {
    debug!("server args: {args:?}");

    let store = PgStore::connect(&args.dsn)
        .await
        .context("could not open the account store")?;

    let mailer: Arc<dyn MailSender> = match &args.smtp {
        Some(config) => Arc::new(SmtpMailSender::new(config)?),
        None => {
            warn!("SMTP not configured; notifications will only be logged");
            Arc::new(LogMailSender)
        }
    };

    let sessions = SessionIssuer::new(&args.session_secret, args.session_ttl_seconds);
    let config = AuthConfig::new(args.base_url, args.mail_from)
        .with_reset_ttl_seconds(args.reset_ttl_seconds);

    let service = Arc::new(AuthService::new(
        Arc::new(store),
        mailer,
        sessions,
        config,
    ));

    let result = consumer::run(
        BusConfig {
            url: args.amqp_url,
            queue: args.queue,
        },
        service,
    )
    .await;

    telemetry::shutdown_tracer();

    result
}
