//! Inbound message envelope.

use chrono::{DateTime, Utc};
use feedloop_core::Result;
use serde::de::DeserializeOwned;

/// A message received from the channel.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
            received_at: Utc::now(),
        }
    }

    /// Decode the payload as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedloop_core::{FeedingDecision, Subject};

    #[test]
    fn test_decode_decision() {
        let decision = FeedingDecision::granted(Subject::new("Pet1"), 0.92);
        let message = InboundMessage::new(
            "pet/dispenser/command",
            serde_json::to_vec(&decision).unwrap(),
        );

        let decoded: FeedingDecision = message.decode().unwrap();
        assert_eq!(decoded, decision);
    }

    #[test]
    fn test_decode_garbage_is_serialization_error() {
        let message = InboundMessage::new("pet/dispenser/command", b"{oops".to_vec());
        let result = message.decode::<FeedingDecision>();
        assert!(matches!(
            result,
            Err(feedloop_core::Error::Serialization(_))
        ));
    }
}
