//! RabbitMQ consumer: the thin transport edge. Declares the durable command
//! queue, decodes each delivery, hands it to the command router, and — when
//! the sender asked for a reply — publishes the result to its `reply_to`
//! queue with the correlation id preserved. Each delivery is processed on
//! its own task; operations for different accounts run concurrently.

use super::{Envelope, handle, malformed_reply};
use crate::auth::AuthService;
use anyhow::{Context, Result};
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer,
    message::Delivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
};
use std::sync::Arc;
use tokio::signal;
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

pub const DEFAULT_QUEUE: &str = "auth_microservice";
const CONSUMER_TAG: &str = "chiave";
const PREFETCH: u16 = 16;

#[derive(Clone, Debug)]
pub struct BusConfig {
    pub url: String,
    pub queue: String,
}

/// Consume the command queue until ctrl-c.
///
/// # Errors
/// Returns an error if the broker connection or queue setup fails; per-
/// delivery failures are logged and the loop keeps running.
pub async fn run(config: BusConfig, service: Arc<AuthService>) -> Result<()> {
    let connection = Connection::connect(&config.url, ConnectionProperties::default())
        .await
        .context("failed to connect to message bus")?;
    let channel = connection
        .create_channel()
        .await
        .context("failed to open bus channel")?;

    channel
        .queue_declare(
            &config.queue,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .context("failed to declare command queue")?;

    channel
        .basic_qos(PREFETCH, BasicQosOptions::default())
        .await
        .context("failed to set prefetch")?;

    let consumer = channel
        .basic_consume(
            &config.queue,
            CONSUMER_TAG,
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("failed to start consuming")?;

    info!(queue = %config.queue, "consuming auth commands");

    tokio::select! {
        result = consume(consumer, channel, service) => result,
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}

async fn consume(
    mut consumer: Consumer,
    channel: Channel,
    service: Arc<AuthService>,
) -> Result<()> {
    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(err) => {
                error!("bus delivery error: {err}");
                continue;
            }
        };

        let channel = channel.clone();
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            process(&channel, &service, delivery).await;
        });
    }

    Ok(())
}

async fn process(channel: &Channel, service: &AuthService, delivery: Delivery) {
    let reply = match serde_json::from_slice::<Envelope>(&delivery.data) {
        Ok(envelope) => handle(service, envelope).await,
        Err(err) => {
            debug!("undecodable envelope: {err}");
            malformed_reply()
        }
    };

    if let Some(reply_to) = delivery.properties.reply_to() {
        let payload = match serde_json::to_vec(&reply) {
            Ok(payload) => payload,
            Err(err) => {
                error!("failed to serialize reply: {err}");
                return;
            }
        };

        let mut properties = BasicProperties::default();
        if let Some(correlation_id) = delivery.properties.correlation_id() {
            properties = properties.with_correlation_id(correlation_id.clone());
        }

        if let Err(err) = channel
            .basic_publish(
                "",
                reply_to.as_str(),
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
        {
            error!("failed to publish reply: {err}");
        }
    }

    if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
        error!("failed to ack delivery: {err}");
    }
}
