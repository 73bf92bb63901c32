use crate::email::smtp::SmtpConfig;
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SMTP_SERVER: &str = "smtp-server";
pub const ARG_SMTP_PORT: &str = "smtp-port";
pub const ARG_SMTP_USER: &str = "smtp-user";
pub const ARG_SMTP_PASSWORD: &str = "smtp-password";
pub const ARG_MAIL_FROM: &str = "mail-from";

pub const DEFAULT_MAIL_FROM: &str = "Chiave <noreply@chiave.dev>";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SMTP_SERVER)
                .long(ARG_SMTP_SERVER)
                .help("SMTP relay host; notifications are logged instead of sent when absent")
                .env("CHIAVE_SMTP_SERVER"),
        )
        .arg(
            Arg::new(ARG_SMTP_PORT)
                .long(ARG_SMTP_PORT)
                .help("SMTP relay port")
                .env("CHIAVE_SMTP_PORT")
                .default_value("465")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SMTP_USER)
                .long(ARG_SMTP_USER)
                .help("SMTP username")
                .env("CHIAVE_SMTP_USER"),
        )
        .arg(
            Arg::new(ARG_SMTP_PASSWORD)
                .long(ARG_SMTP_PASSWORD)
                .help("SMTP password")
                .env("CHIAVE_SMTP_PASSWORD"),
        )
        .arg(
            Arg::new(ARG_MAIL_FROM)
                .long(ARG_MAIL_FROM)
                .help("From address on outbound notifications")
                .env("CHIAVE_MAIL_FROM")
                .default_value(DEFAULT_MAIL_FROM),
        )
}

#[derive(Debug)]
pub struct Options {
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
}

impl Options {
    /// # Errors
    /// Returns an error if SMTP is partially configured; `validate()` in the
    /// parent module reports the same earlier with a friendlier message.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let mail_from = matches
            .get_one::<String>(ARG_MAIL_FROM)
            .cloned()
            .unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string());

        let Some(server) = matches.get_one::<String>(ARG_SMTP_SERVER).cloned() else {
            return Ok(Self {
                smtp: None,
                mail_from,
            });
        };

        let port = matches
            .get_one::<u16>(ARG_SMTP_PORT)
            .copied()
            .unwrap_or(465);
        let username = matches
            .get_one::<String>(ARG_SMTP_USER)
            .cloned()
            .context("missing required argument: --smtp-user")?;
        let password = matches
            .get_one::<String>(ARG_SMTP_PASSWORD)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --smtp-password")?;

        Ok(Self {
            smtp: Some(SmtpConfig {
                server,
                port,
                username,
                password,
            }),
            mail_from,
        })
    }
}
