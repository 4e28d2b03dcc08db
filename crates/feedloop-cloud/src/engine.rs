//! The feeding decision engine.
//!
//! Deterministic and total: every classification yields exactly one
//! decision for exactly one subject. The engine never fuses multiple
//! candidate labels.

use std::sync::Arc;

use chrono::Utc;
use feedloop_core::config::DecisionConfig;
use feedloop_core::{ClassificationResult, FeedingDecision, Result, SubjectCatalog};
use feedloop_storage::CooldownStore;

/// Combines a classification result with cooldown state.
pub struct DecisionEngine {
    store: Arc<dyn CooldownStore>,
    catalog: SubjectCatalog,
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(
        store: Arc<dyn CooldownStore>,
        catalog: SubjectCatalog,
        config: DecisionConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    /// Decide whether to feed the classified subject.
    ///
    /// The threshold comparison is strict (`>` feeds) and the cooldown
    /// comparison is inclusive (`>=` elapsed feeds); the asymmetry is
    /// part of the contract. The store is only touched on the path that
    /// can feed, and a positive decision updates the record atomically
    /// with the check. A store failure propagates — the engine never
    /// guesses feeding state from stale defaults.
    pub async fn decide(&self, result: &ClassificationResult) -> Result<FeedingDecision> {
        if self.catalog.is_sentinel(&result.label) {
            return Ok(FeedingDecision::denied(
                result.label.clone(),
                result.confidence,
            ));
        }

        if result.confidence <= self.config.confidence_threshold {
            return Ok(FeedingDecision::denied(
                result.label.clone(),
                result.confidence,
            ));
        }

        if !self.catalog.is_known(&result.label) {
            tracing::warn!(
                "Classifier produced a label outside the catalog: {}",
                result.label
            );
            return Ok(FeedingDecision::denied(
                result.label.clone(),
                result.confidence,
            ));
        }

        let fed = self
            .store
            .claim_if_elapsed(&result.label, Utc::now(), self.config.cooldown_window())
            .await
            .map_err(feedloop_core::Error::from)?;

        Ok(if fed {
            FeedingDecision::granted(result.label.clone(), result.confidence)
        } else {
            FeedingDecision::denied(result.label.clone(), result.confidence)
        })
    }
}
