//! Message channel abstraction for Feedloop.
//!
//! Two logical, independently-subscribable topics (request and response)
//! over an at-least-once transport. Consumers must tolerate duplicate
//! messages. The channel itself carries no request/response correlation;
//! the payloads do (see `feedloop_core::message`).

pub mod local;
pub mod message;
#[cfg(feature = "mqtt")]
pub mod mqtt;

use async_trait::async_trait;
use feedloop_core::Result;
use tokio::sync::broadcast;

pub use local::LocalChannel;
pub use message::InboundMessage;
#[cfg(feature = "mqtt")]
pub use mqtt::MqttChannel;

/// Default capacity of the inbound fan-out bus.
pub const DEFAULT_BUS_CAPACITY: usize = 1000;

/// An at-least-once pub/sub transport.
///
/// `subscribe` registers interest in a topic and returns a receiver on
/// the channel's inbound bus. The bus fans out every inbound message on
/// any subscribed topic; receivers filter by [`InboundMessage::topic`].
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Publish a payload on a topic.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// Subscribe to a topic and obtain a receiver for inbound messages.
    async fn subscribe(&self, topic: &str) -> Result<broadcast::Receiver<InboundMessage>>;
}
