//! Image reference resolution.
//!
//! Requests carry an opaque `image_url`; the fetcher turns it into
//! bytes. Storage events carry `(bucket, key)` instead, from which the
//! public object URL is derived.

use async_trait::async_trait;
use feedloop_core::{Error, Result, StorageEvent};

/// Resolves an opaque image reference to bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, image_url: &str) -> Result<Vec<u8>>;
}

/// Public object URL for a storage event.
pub fn object_url(event: &StorageEvent, region: &str) -> String {
    format!(
        "https://{}.s3.{}.amazonaws.com/{}",
        event.bucket, region, event.key
    )
}

/// HTTP fetcher for image references.
#[derive(Default)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, image_url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("image fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Inference(format!(
                "image fetch returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Inference(format!("image read failed: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_shape() {
        let event = StorageEvent::new("petimagestorage", "abc123.jpg");
        assert_eq!(
            object_url(&event, "us-east-1"),
            "https://petimagestorage.s3.us-east-1.amazonaws.com/abc123.jpg"
        );
    }
}
