use crate::auth::{DEFAULT_RESET_TTL_SECONDS, session::DEFAULT_SESSION_TTL_SECONDS};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_TTL: &str = "session-ttl-seconds";
pub const ARG_RESET_TTL: &str = "reset-ttl-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_URL)
                .long(ARG_BASE_URL)
                .help("Base URL used to build activation and reset links")
                .env("CHIAVE_BASE_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("HS256 secret for signing session tokens")
                .env("CHIAVE_SESSION_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Session token lifetime in seconds")
                .env("CHIAVE_SESSION_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_RESET_TTL)
                .long(ARG_RESET_TTL)
                .help("Password reset token lifetime in seconds")
                .env("CHIAVE_RESET_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub base_url: String,
    pub session_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub reset_ttl_seconds: i64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let base_url = matches
            .get_one::<String>(ARG_BASE_URL)
            .cloned()
            .context("missing required argument: --base-url")?;
        let session_secret = matches
            .get_one::<String>(ARG_SESSION_SECRET)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --session-secret")?;
        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL)
            .copied()
            .unwrap_or(DEFAULT_SESSION_TTL_SECONDS);
        let reset_ttl_seconds = matches
            .get_one::<i64>(ARG_RESET_TTL)
            .copied()
            .unwrap_or(DEFAULT_RESET_TTL_SECONDS);

        Ok(Self {
            base_url,
            session_secret,
            session_ttl_seconds,
            reset_ttl_seconds,
        })
    }
}
