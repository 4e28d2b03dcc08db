//! Configuration for the agent and cloud processes.
//!
//! Serde-backed structures with deployment defaults. A JSON file
//! provides overrides; the broker endpoint can additionally be
//! overridden from the environment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::subject::SubjectCatalog;

/// Environment variable names.
pub mod env_vars {
    /// Overrides `channel.broker` when set.
    pub const MQTT_ENDPOINT: &str = "MQTT_ENDPOINT";
}

/// Channel (MQTT) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Broker host.
    #[serde(default = "default_broker")]
    pub broker: String,

    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Client ID (auto-generated if not provided).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Username for authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u64,

    /// Connection attempts before giving up. Exhaustion is fatal for the
    /// process.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Delay between connection attempts in seconds.
    #[serde(default = "default_connect_delay")]
    pub connect_delay: u64,
}

fn default_broker() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    1883
}
fn default_keep_alive() -> u64 {
    60
}
fn default_connect_attempts() -> u32 {
    5
}
fn default_connect_delay() -> u64 {
    5
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            port: default_port(),
            client_id: None,
            username: None,
            password: None,
            keep_alive: default_keep_alive(),
            connect_attempts: default_connect_attempts(),
            connect_delay: default_connect_delay(),
        }
    }
}

impl ChannelConfig {
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_secs(self.connect_delay)
    }
}

/// Names of the two logical topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Request topic: carries image references from the agent.
    #[serde(default = "default_request_topic")]
    pub request: String,

    /// Response topic: carries feeding decisions back to the agent.
    #[serde(default = "default_response_topic")]
    pub response: String,
}

fn default_request_topic() -> String {
    "pet/dispenser/image".to_string()
}
fn default_response_topic() -> String {
    "pet/dispenser/command".to_string()
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            request: default_request_topic(),
            response: default_response_topic(),
        }
    }
}

/// Decision engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Minimum classifier score required to act. The comparison is strict:
    /// a score exactly at the threshold does not feed.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Minimum elapsed seconds between two positive decisions for the same
    /// subject. The comparison is inclusive: exactly this much elapsed
    /// time qualifies.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_confidence_threshold() -> f64 {
    0.85
}
fn default_cooldown_secs() -> u64 {
    4 * 3600
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl DecisionConfig {
    pub fn cooldown_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs as i64)
    }
}

/// Capture agent loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Seconds between the end of one cycle and the start of the next.
    #[serde(default = "default_cycle_period")]
    pub cycle_period: u64,

    /// Bounded wait for a decision, in seconds.
    #[serde(default = "default_response_timeout")]
    pub response_timeout: u64,

    /// Endpoint of the capture daemon that stages frames and returns
    /// their references.
    #[serde(default = "default_capture_endpoint")]
    pub capture_endpoint: String,

    /// Endpoint of the dispenser controller.
    #[serde(default = "default_actuator_endpoint")]
    pub actuator_endpoint: String,
}

fn default_cycle_period() -> u64 {
    30
}
fn default_response_timeout() -> u64 {
    30
}
fn default_capture_endpoint() -> String {
    "http://localhost:9900/capture".to_string()
}
fn default_actuator_endpoint() -> String {
    "http://localhost:9900/feed".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cycle_period: default_cycle_period(),
            response_timeout: default_response_timeout(),
            capture_endpoint: default_capture_endpoint(),
            actuator_endpoint: default_actuator_endpoint(),
        }
    }
}

impl AgentConfig {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs(self.cycle_period)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout)
    }
}

/// Cloud-side service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Inference endpoint for the HTTP classifier.
    #[serde(default = "default_classifier_endpoint")]
    pub classifier_endpoint: String,

    /// Object storage region used to derive image URLs from storage
    /// events.
    #[serde(default = "default_region")]
    pub region: String,

    /// Path of the cooldown database file.
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

fn default_classifier_endpoint() -> String {
    "http://localhost:8501/v1/classify".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_store_path() -> String {
    "data/cooldown.redb".to_string()
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            classifier_endpoint: default_classifier_endpoint(),
            region: default_region(),
            store_path: default_store_path(),
        }
    }
}

/// Top-level configuration shared by both processes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedloopConfig {
    pub channel: ChannelConfig,
    pub topics: TopicConfig,
    pub decision: DecisionConfig,
    pub agent: AgentConfig,
    pub cloud: CloudConfig,
    pub catalog: SubjectCatalog,
}

impl FeedloopConfig {
    /// Load configuration from a JSON file and apply environment
    /// overrides. Missing fields fall back to the deployment defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("cannot read {:?}: {}", path.as_ref(), e)))?;
        let mut config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid config: {}", e)))?;
        config.apply_env();
        Ok(config)
    }

    /// Apply environment overrides on top of the loaded values.
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var(env_vars::MQTT_ENDPOINT) {
            if !endpoint.is_empty() {
                self.channel.broker = endpoint;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = FeedloopConfig::default();
        assert_eq!(config.decision.confidence_threshold, 0.85);
        assert_eq!(config.decision.cooldown_secs, 14_400);
        assert_eq!(config.agent.cycle_period, 30);
        assert_eq!(config.agent.response_timeout, 30);
        assert_eq!(config.channel.connect_attempts, 5);
        assert_eq!(config.channel.connect_delay, 5);
        assert_eq!(config.topics.request, "pet/dispenser/image");
        assert_eq!(config.topics.response, "pet/dispenser/command");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: FeedloopConfig =
            serde_json::from_str(r#"{"channel": {"broker": "mqtt.example.com"}}"#).unwrap();
        assert_eq!(config.channel.broker, "mqtt.example.com");
        assert_eq!(config.channel.port, 1883);
        assert_eq!(config.decision.confidence_threshold, 0.85);
    }

    #[test]
    fn test_cooldown_window() {
        let config = DecisionConfig::default();
        assert_eq!(config.cooldown_window(), chrono::Duration::hours(4));
    }

    #[test]
    fn test_channel_builders() {
        let config = ChannelConfig::new("broker.local")
            .with_port(8883)
            .with_auth("user", "pass")
            .with_client_id("feeder-1");
        assert_eq!(config.broker, "broker.local");
        assert_eq!(config.port, 8883);
        assert_eq!(config.username, Some("user".to_string()));
        assert_eq!(config.client_id, Some("feeder-1".to_string()));
    }
}
