//! In-process channel over a tokio broadcast bus.
//!
//! Used by tests and single-process deployments where the agent and the
//! decision service run in the same binary. Semantics match the MQTT
//! channel: fan-out to all receivers, receivers filter by topic,
//! messages published with no subscriber are discarded.

use async_trait::async_trait;
use feedloop_core::Result;
use tokio::sync::broadcast;

use crate::message::InboundMessage;
use crate::{MessageChannel, DEFAULT_BUS_CAPACITY};

/// Loopback channel.
#[derive(Clone)]
pub struct LocalChannel {
    tx: broadcast::Sender<InboundMessage>,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// The capacity bounds how far a slow receiver may lag before it
    /// starts losing messages.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageChannel for LocalChannel {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        // A send with no receivers is not an error: like a broker with no
        // subscriber, the message is simply dropped.
        let _ = self.tx.send(InboundMessage::new(topic, payload));
        Ok(())
    }

    async fn subscribe(&self, _topic: &str) -> Result<broadcast::Receiver<InboundMessage>> {
        Ok(self.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe_round_trip() {
        let channel = LocalChannel::new();
        let mut rx = channel.subscribe("pet/dispenser/command").await.unwrap();

        channel
            .publish("pet/dispenser/command", b"hello".to_vec())
            .await
            .unwrap();

        let message = rx.recv().await.unwrap();
        assert_eq!(message.topic, "pet/dispenser/command");
        assert_eq!(message.payload, b"hello");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let channel = LocalChannel::new();
        channel
            .publish("pet/dispenser/image", b"dropped".to_vec())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fan_out_to_all_receivers() {
        let channel = LocalChannel::new();
        let mut rx1 = channel.subscribe("t").await.unwrap();
        let mut rx2 = channel.subscribe("t").await.unwrap();

        channel.publish("t", b"x".to_vec()).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap().payload, b"x");
        assert_eq!(rx2.recv().await.unwrap().payload, b"x");
    }
}
