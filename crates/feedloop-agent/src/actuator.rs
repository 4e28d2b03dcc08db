//! Feeding actuator capability.
//!
//! The physical pulse sequence is external; the agent only ever asks for
//! one feeding action and observes success or failure.

use async_trait::async_trait;
use feedloop_core::{Error, Result};

/// Triggers one feeding action.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn activate(&self) -> Result<()>;
}

/// Actuator backed by the dispenser controller's HTTP endpoint.
pub struct HttpActuator {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpActuator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Actuator for HttpActuator {
    async fn activate(&self) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::Actuator(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Actuator(format!(
                "dispenser controller returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
