//! Classifier capability.
//!
//! The model itself is an external collaborator: the pipeline only
//! depends on `classify(bytes) -> (label, confidence)`. The concrete
//! classifier is created once during process startup and shared
//! read-only (`Arc`) across all invocations; there is no per-request
//! loading and no teardown within a process lifetime.

use async_trait::async_trait;
use feedloop_core::{ClassificationResult, Error, Result};
use serde::Deserialize;

/// Maps raw image bytes to a label and confidence.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> Result<ClassificationResult>;
}

/// Classifier backed by an HTTP inference endpoint.
///
/// Posts the raw image bytes and expects a JSON reply:
/// `{"label": "Pet1", "confidence": 0.92}`.
pub struct HttpClassifier {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ClassifyReply {
    label: String,
    confidence: f64,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, image: &[u8]) -> Result<ClassificationResult> {
        if image.is_empty() {
            return Err(Error::Inference("empty image payload".to_string()));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| Error::Inference(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Inference(format!(
                "inference endpoint returned {}",
                response.status()
            )));
        }

        let reply: ClassifyReply = response
            .json()
            .await
            .map_err(|e| Error::Inference(e.to_string()))?;

        Ok(ClassificationResult::new(reply.label, reply.confidence))
    }
}
