//! The cloud entry point.
//!
//! Classify, decide, publish, answer. Every classified frame produces a
//! published decision — including negatives — so the capture agent is
//! never left waiting on a silent drop. Internal failure detail stays in
//! the logs; callers of the entry point only ever see a generic error.

use std::sync::Arc;

use feedloop_core::config::TopicConfig;
use feedloop_core::{FeedingDecision, InvocationResult, Result, StorageEvent};
use feedloop_channel::MessageChannel;
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::engine::DecisionEngine;
use crate::fetcher::{object_url, ImageFetcher};

/// Decision pipeline shared by the request worker and the storage-event
/// entry point.
pub struct DecisionService {
    classifier: Arc<dyn Classifier>,
    fetcher: Arc<dyn ImageFetcher>,
    engine: DecisionEngine,
    channel: Arc<dyn MessageChannel>,
    topics: TopicConfig,
    region: String,
}

impl DecisionService {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        fetcher: Arc<dyn ImageFetcher>,
        engine: DecisionEngine,
        channel: Arc<dyn MessageChannel>,
        topics: TopicConfig,
        region: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            fetcher,
            engine,
            channel,
            topics,
            region: region.into(),
        }
    }

    /// Classify the image, decide, and publish the decision.
    ///
    /// On a decision-store failure this fails closed: a `fed = false`
    /// decision is still published (the agent gets its answer) and the
    /// error propagates to the caller.
    pub async fn handle_image(
        &self,
        image: &[u8],
        request_id: Option<Uuid>,
    ) -> Result<FeedingDecision> {
        let classification = self.classifier.classify(image).await?;
        tracing::debug!(
            "Classified as {} (confidence {:.3})",
            classification.label,
            classification.confidence
        );

        let decision = match self.engine.decide(&classification).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!("Decision failed for {}: {}", classification.label, e);
                let denied = Self::correlate(
                    FeedingDecision::denied(classification.label, classification.confidence),
                    request_id,
                );
                self.publish_decision(&denied).await?;
                return Err(e);
            }
        };

        let decision = Self::correlate(decision, request_id);
        self.publish_decision(&decision).await?;
        tracing::info!(
            "Decision published: label={} confidence={:.2} fed={}",
            decision.recognized_label,
            decision.confidence_score,
            decision.fed
        );
        Ok(decision)
    }

    /// Entry point for storage-event-style triggers.
    ///
    /// Never returns internal error detail: any failure maps to a
    /// generic 500 result.
    pub async fn handle_storage_event(&self, event: &StorageEvent) -> InvocationResult {
        let url = object_url(event, &self.region);
        let image = match self.fetcher.fetch(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Image fetch failed for {}: {}", url, e);
                return InvocationResult::failure();
            }
        };

        match self.handle_image(&image, None).await {
            Ok(decision) => InvocationResult::ok(&decision),
            Err(e) => {
                tracing::error!("Invocation failed for {}/{}: {}", event.bucket, event.key, e);
                InvocationResult::failure()
            }
        }
    }

    fn correlate(decision: FeedingDecision, request_id: Option<Uuid>) -> FeedingDecision {
        match request_id {
            Some(id) => decision.with_request_id(id),
            None => decision,
        }
    }

    async fn publish_decision(&self, decision: &FeedingDecision) -> Result<()> {
        let payload = serde_json::to_vec(decision)?;
        self.channel.publish(&self.topics.response, payload).await
    }
}
