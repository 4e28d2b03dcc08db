//! Frame acquisition capability.
//!
//! Capture hardware and object storage upload are external
//! collaborators; the agent only needs an opaque reference it can put in
//! a request. A capture daemon owns the camera and the upload and hands
//! back the staged frame's reference.

use async_trait::async_trait;
use feedloop_core::{Error, Result};
use serde::Deserialize;

/// Opaque reference to staged image bytes, resolvable by the inference
/// pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Captures a frame and stages it for inference.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn acquire(&self) -> Result<ImageRef>;
}

/// Frame source backed by a local capture daemon.
///
/// A POST asks the daemon to capture and upload one frame; the reply is
/// `{"image_url": "..."}`.
pub struct HttpFrameSource {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CaptureReply {
    image_url: String,
}

impl HttpFrameSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FrameSource for HttpFrameSource {
    async fn acquire(&self) -> Result<ImageRef> {
        let response = self
            .client
            .post(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::Capture(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Capture(format!(
                "capture daemon returned {}",
                response.status()
            )));
        }

        let reply: CaptureReply = response
            .json()
            .await
            .map_err(|e| Error::Capture(e.to_string()))?;

        Ok(ImageRef::new(reply.image_url))
    }
}
