//! MQTT channel over rumqttc.
//!
//! A long-lived session with a spawned event-loop task. Inbound publishes
//! fan out on a broadcast bus; subscriptions are re-issued whenever the
//! broker acknowledges a (re)connection, so a dropped session resumes
//! with the same topic interest. Publishes accepted while the session is
//! reconnecting sit in the client's request queue and drain on reconnect.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feedloop_core::config::ChannelConfig;
use feedloop_core::{Error, Result};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::message::InboundMessage;
use crate::{MessageChannel, DEFAULT_BUS_CAPACITY};

/// How long a single connection attempt may take before it is counted as
/// failed.
const CONNECT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay before re-polling the event loop after a connection error.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Consecutive errors logged at error level before dropping to debug.
const MAX_LOGGED_ERRORS: u32 = 3;

/// MQTT-backed [`MessageChannel`].
pub struct MqttChannel {
    client: AsyncClient,
    bus: broadcast::Sender<InboundMessage>,
    subscriptions: Arc<RwLock<HashSet<String>>>,
}

impl MqttChannel {
    /// Establish a session, retrying with the configured bounded number
    /// of attempts and fixed inter-attempt delay. Exhausting the attempts
    /// returns a connect error; callers treat that as fatal rather than
    /// running disconnected.
    pub async fn connect(config: &ChannelConfig) -> Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("feedloop_{}", Uuid::new_v4()));

        let mut options = MqttOptions::new(client_id, &config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive));
        if let (Some(u), Some(p)) = (&config.username, &config.password) {
            options.set_credentials(u, p);
        }

        let mut last_error = String::new();
        for attempt in 1..=config.connect_attempts.max(1) {
            let (client, mut eventloop) = AsyncClient::new(options.clone(), 64);

            match Self::await_connack(&mut eventloop).await {
                Ok(()) => {
                    tracing::info!(
                        "Connected to MQTT broker {}:{} (attempt {})",
                        config.broker,
                        config.port,
                        attempt
                    );

                    let (bus, _) = broadcast::channel(DEFAULT_BUS_CAPACITY);
                    let subscriptions = Arc::new(RwLock::new(HashSet::new()));
                    Self::spawn_event_loop(
                        eventloop,
                        client.clone(),
                        bus.clone(),
                        subscriptions.clone(),
                    );

                    return Ok(Self {
                        client,
                        bus,
                        subscriptions,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Connection attempt {}/{} failed: {}",
                        attempt,
                        config.connect_attempts,
                        e
                    );
                    last_error = e.to_string();
                    if attempt < config.connect_attempts {
                        tokio::time::sleep(config.connect_delay()).await;
                    }
                }
            }
        }

        Err(Error::Connect(format!(
            "failed to connect after {} attempts: {}",
            config.connect_attempts, last_error
        )))
    }

    /// Drive the event loop until the broker acknowledges the connection.
    async fn await_connack(eventloop: &mut EventLoop) -> Result<()> {
        let wait = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => {}
                    Err(e) => return Err(Error::Connect(e.to_string())),
                }
            }
        };

        tokio::time::timeout(CONNECT_ATTEMPT_TIMEOUT, wait)
            .await
            .map_err(|_| Error::Connect("connection attempt timed out".to_string()))?
    }

    /// Spawn the background task that keeps the session alive.
    fn spawn_event_loop(
        mut eventloop: EventLoop,
        client: AsyncClient,
        bus: broadcast::Sender<InboundMessage>,
        subscriptions: Arc<RwLock<HashSet<String>>>,
    ) {
        tokio::spawn(async move {
            let mut error_count: u32 = 0;

            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        error_count = 0;
                        let message =
                            InboundMessage::new(publish.topic.clone(), publish.payload.to_vec());
                        // No receivers means nobody is waiting; drop.
                        let _ = bus.send(message);
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        error_count = 0;
                        // Session resumed: re-issue every subscription.
                        let topics = subscriptions.read().await.clone();
                        for topic in topics {
                            if let Err(e) = client.subscribe(&topic, QoS::AtLeastOnce).await {
                                tracing::warn!("Re-subscribe to {} failed: {}", topic, e);
                            }
                        }
                    }
                    Ok(_) => {
                        error_count = 0;
                    }
                    Err(rumqttc::ConnectionError::RequestsDone) => {
                        tracing::info!("MQTT client closed, stopping event loop");
                        break;
                    }
                    Err(e) => {
                        error_count += 1;
                        if error_count <= MAX_LOGGED_ERRORS {
                            tracing::error!("MQTT connection error: {}", e);
                        } else {
                            tracing::debug!("MQTT connection error (repeat): {}", e);
                        }
                        // The next poll reconnects; pace the retries.
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
        });
    }
}

#[async_trait]
impl MessageChannel for MqttChannel {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| Error::Publish(e.to_string()))
    }

    async fn subscribe(&self, topic: &str) -> Result<broadcast::Receiver<InboundMessage>> {
        self.subscriptions.write().await.insert(topic.to_string());
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;
        Ok(self.bus.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_exhaustion_is_fatal() {
        // Nothing listens on port 1; every attempt fails fast.
        let config = ChannelConfig::new("127.0.0.1").with_port(1);
        let config = ChannelConfig {
            connect_attempts: 2,
            connect_delay: 0,
            ..config
        };

        let result = MqttChannel::connect(&config).await;
        assert!(matches!(result, Err(Error::Connect(_))));
    }
}
