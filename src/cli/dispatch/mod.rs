//! Command-line argument dispatch.
//!
//! Maps validated CLI matches onto the action the binary executes, bundling
//! the bus, store, session, and mail configuration for the server loop.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{self, auth, bus, smtp};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let dsn = matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    commands::validate(matches).map_err(|e| anyhow::anyhow!(e))?;

    let bus_opts = bus::Options::parse(matches)?;
    let auth_opts = auth::Options::parse(matches)?;
    let smtp_opts = smtp::Options::parse(matches)?;

    Ok(Action::Server(Args {
        dsn,
        amqp_url: bus_opts.url,
        queue: bus_opts.queue,
        base_url: auth_opts.base_url,
        session_secret: auth_opts.session_secret,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        reset_ttl_seconds: auth_opts.reset_ttl_seconds,
        smtp: smtp_opts.smtp,
        mail_from: smtp_opts.mail_from,
    }))
}
