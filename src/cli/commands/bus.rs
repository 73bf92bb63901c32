use crate::bus::consumer::DEFAULT_QUEUE;
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_AMQP_URL: &str = "amqp-url";
pub const ARG_QUEUE: &str = "queue";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AMQP_URL)
                .long(ARG_AMQP_URL)
                .help("RabbitMQ connection URL")
                .env("CHIAVE_AMQP_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_QUEUE)
                .long(ARG_QUEUE)
                .help("Durable queue carrying auth commands")
                .env("CHIAVE_QUEUE")
                .default_value(DEFAULT_QUEUE),
        )
}

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub queue: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let url = matches
            .get_one::<String>(ARG_AMQP_URL)
            .cloned()
            .context("missing required argument: --amqp-url")?;
        let queue = matches
            .get_one::<String>(ARG_QUEUE)
            .cloned()
            .unwrap_or_else(|| DEFAULT_QUEUE.to_string());

        Ok(Self { url, queue })
    }
}
