//! Request-topic consumer.
//!
//! Production deployments trigger the entry point from storage events;
//! this worker expresses the same pipeline as an in-process consumer of
//! the request topic, so a single binary (or a test) can serve agents
//! end to end. Delivery is at-least-once: a duplicate positive request
//! re-enters the cooldown check and comes back `fed = false`.

use std::sync::Arc;

use feedloop_core::config::TopicConfig;
use feedloop_core::{FeedRequest, Result};
use feedloop_channel::{InboundMessage, MessageChannel};
use tokio::sync::{broadcast, watch};

use crate::fetcher::ImageFetcher;
use crate::service::DecisionService;

/// Long-running consumer of the request topic.
pub struct RequestWorker {
    service: Arc<DecisionService>,
    channel: Arc<dyn MessageChannel>,
    topics: TopicConfig,
    fetcher: Arc<dyn ImageFetcher>,
}

impl RequestWorker {
    pub fn new(
        service: Arc<DecisionService>,
        channel: Arc<dyn MessageChannel>,
        topics: TopicConfig,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            service,
            channel,
            topics,
            fetcher,
        }
    }

    /// Consume requests until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut rx = self.channel.subscribe(&self.topics.request).await?;
        tracing::info!("Request worker listening on {}", self.topics.request);

        loop {
            tokio::select! {
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = rx.recv() => match received {
                    Ok(message) => {
                        if message.topic == self.topics.request {
                            self.process(message).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Request receiver lagged, {} messages skipped", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        tracing::info!("Request worker stopped");
        Ok(())
    }

    /// One request: decode, resolve the image reference, run the
    /// pipeline. Failures are cycle-local — logged and skipped, never
    /// fatal for the worker.
    async fn process(&self, message: InboundMessage) {
        let request: FeedRequest = match message.decode() {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Malformed request payload: {}", e);
                return;
            }
        };

        let image = match self.fetcher.fetch(&request.image_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Image fetch failed for {}: {}", request.image_url, e);
                return;
            }
        };

        if let Err(e) = self
            .service
            .handle_image(&image, Some(request.request_id))
            .await
        {
            tracing::error!("Request {} failed: {}", request.request_id, e);
        }
    }
}
