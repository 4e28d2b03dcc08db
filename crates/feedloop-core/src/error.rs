//! Unified error handling for Feedloop.
//!
//! One error type shared across the workspace, covering the failure
//! taxonomy of the coordination protocol plus the ambient variants.
//! Crate-local errors (storage backends) convert into this type.

/// Unified error type for Feedloop.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Image acquisition failed on the edge device.
    #[error("Capture error: {0}")]
    Capture(String),

    /// Publishing a message on the channel failed.
    #[error("Publish error: {0}")]
    Publish(String),

    /// Establishing the channel session failed.
    #[error("Connect error: {0}")]
    Connect(String),

    /// No decision arrived within the bounded wait.
    #[error("Response timed out after {0:?}")]
    ResponseTimeout(std::time::Duration),

    /// The classifier could not produce a result for the input.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Cooldown persistence unreachable or corrupt.
    #[error("Decision store error: {0}")]
    Store(String),

    /// The feeding actuator reported a failure.
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// Channel errors other than publish/connect.
    #[error("Channel error: {0}")]
    Channel(String),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_taxonomy() {
        let e = Error::Store("db unreachable".to_string());
        assert_eq!(e.to_string(), "Decision store error: db unreachable");

        let e = Error::ResponseTimeout(std::time::Duration::from_secs(30));
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn test_from_serde_json() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let e: Error = bad.unwrap_err().into();
        assert!(matches!(e, Error::Serialization(_)));
    }
}
