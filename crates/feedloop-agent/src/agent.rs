//! The capture agent state machine.
//!
//! One decision cycle walks `Idle → Capturing → Publishing →
//! AwaitingResponse → Acting → Idle`. The wait for a decision is a
//! blocking wait on the response subscription bounded by a single
//! deadline — there is no sleep-and-poll. A shutdown signal unblocks any
//! wait and skips the remainder of the cycle.

use std::sync::Arc;

use feedloop_core::config::{AgentConfig, TopicConfig};
use feedloop_core::{FeedRequest, FeedingDecision, Result};
use feedloop_channel::{InboundMessage, MessageChannel};
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::actuator::Actuator;
use crate::capture::FrameSource;

/// States of the decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Capturing,
    Publishing,
    AwaitingResponse,
    Acting,
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Positive decision received; the actuator was invoked.
    Fed,
    /// Definitive negative decision received.
    NotFed,
    /// No decision within the bounded wait; implicit negative.
    TimedOut,
    /// Cycle abandoned before a decision (capture or publish failure).
    Aborted,
    /// Shutdown requested mid-cycle.
    Interrupted,
}

enum WaitResult {
    Decision(FeedingDecision),
    TimedOut,
    Shutdown,
}

/// The edge-side loop: one outstanding request at a time.
pub struct CaptureAgent {
    channel: Arc<dyn MessageChannel>,
    frames: Arc<dyn FrameSource>,
    actuator: Arc<dyn Actuator>,
    topics: TopicConfig,
    config: AgentConfig,
    state: AgentState,
}

impl CaptureAgent {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        frames: Arc<dyn FrameSource>,
        actuator: Arc<dyn Actuator>,
        topics: TopicConfig,
        config: AgentConfig,
    ) -> Self {
        Self {
            channel,
            frames,
            actuator,
            topics,
            config,
            state: AgentState::Idle,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Run cycles until shutdown, with the fixed period measured from
    /// the end of one cycle to the start of the next.
    ///
    /// The channel session must already be established; connect-retry
    /// policy lives with the channel.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::info!(
            "Capture agent started (period {:?}, response timeout {:?})",
            self.config.cycle_period(),
            self.config.response_timeout()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.run_cycle(&mut shutdown).await;
            tracing::debug!("Cycle finished: {:?}", outcome);

            if outcome == CycleOutcome::Interrupted || *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.cycle_period()) => {}
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.enter(AgentState::Idle);
        tracing::info!("Capture agent stopped");
        Ok(())
    }

    /// One full traversal of the state machine.
    pub async fn run_cycle(&mut self, shutdown: &mut watch::Receiver<bool>) -> CycleOutcome {
        self.enter(AgentState::Capturing);
        let image_ref = match self.frames.acquire().await {
            Ok(image_ref) => image_ref,
            Err(e) => {
                tracing::warn!("Capture failed, abandoning cycle: {}", e);
                self.enter(AgentState::Idle);
                return CycleOutcome::Aborted;
            }
        };

        // Subscribe before publishing so the decision cannot slip past
        // between the two.
        let mut responses = match self.channel.subscribe(&self.topics.response).await {
            Ok(rx) => rx,
            Err(e) => {
                tracing::warn!("Response subscription failed, abandoning cycle: {}", e);
                self.enter(AgentState::Idle);
                return CycleOutcome::Aborted;
            }
        };

        self.enter(AgentState::Publishing);
        let request = FeedRequest::new(image_ref.as_str());
        let payload = match serde_json::to_vec(&request) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Request encoding failed, abandoning cycle: {}", e);
                self.enter(AgentState::Idle);
                return CycleOutcome::Aborted;
            }
        };
        if let Err(e) = self.channel.publish(&self.topics.request, payload).await {
            tracing::warn!("Publish failed, abandoning cycle: {}", e);
            self.enter(AgentState::Idle);
            return CycleOutcome::Aborted;
        }
        tracing::debug!("Request {} published for {}", request.request_id, image_ref);

        self.enter(AgentState::AwaitingResponse);
        let decision = match self
            .await_decision(&mut responses, request.request_id, shutdown)
            .await
        {
            WaitResult::Decision(decision) => decision,
            WaitResult::TimedOut => {
                // A missing decision is never a positive signal.
                tracing::info!(
                    "No decision within {:?} for request {}, treating as not fed",
                    self.config.response_timeout(),
                    request.request_id
                );
                self.enter(AgentState::Idle);
                return CycleOutcome::TimedOut;
            }
            WaitResult::Shutdown => {
                self.enter(AgentState::Idle);
                return CycleOutcome::Interrupted;
            }
        };

        self.enter(AgentState::Acting);
        let outcome = if decision.fed {
            tracing::info!(
                "Feeding {} (confidence {:.2})",
                decision.recognized_label,
                decision.confidence_score
            );
            if let Err(e) = self.actuator.activate().await {
                // The loop must survive actuator trouble.
                tracing::error!("Actuator failed: {}", e);
            }
            CycleOutcome::Fed
        } else {
            tracing::info!(
                "No action for {} (confidence {:.2})",
                decision.recognized_label,
                decision.confidence_score
            );
            CycleOutcome::NotFed
        };

        self.enter(AgentState::Idle);
        outcome
    }

    /// Wait for the decision that answers `request_id`.
    ///
    /// One deadline bounds the whole wait. Responses carrying a
    /// different correlation id are stale or foreign and are discarded
    /// without resetting the deadline; responses with no id are accepted
    /// for compatibility with legacy emitters.
    async fn await_decision(
        &self,
        responses: &mut broadcast::Receiver<InboundMessage>,
        request_id: Uuid,
        shutdown: &mut watch::Receiver<bool>,
    ) -> WaitResult {
        let deadline = tokio::time::Instant::now() + self.config.response_timeout();

        loop {
            tokio::select! {
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        return WaitResult::Shutdown;
                    }
                }
                received = tokio::time::timeout_at(deadline, responses.recv()) => match received {
                    Err(_) => return WaitResult::TimedOut,
                    Ok(Ok(message)) => {
                        if message.topic != self.topics.response {
                            continue;
                        }
                        let decision: FeedingDecision = match message.decode() {
                            Ok(decision) => decision,
                            Err(e) => {
                                tracing::warn!("Malformed decision payload: {}", e);
                                continue;
                            }
                        };
                        if let Some(id) = decision.request_id {
                            if id != request_id {
                                tracing::debug!(
                                    "Discarding decision for request {} (waiting on {})",
                                    id,
                                    request_id
                                );
                                continue;
                            }
                        }
                        return WaitResult::Decision(decision);
                    }
                    Ok(Err(broadcast::error::RecvError::Lagged(n))) => {
                        tracing::warn!("Response receiver lagged, {} messages skipped", n);
                    }
                    Ok(Err(broadcast::error::RecvError::Closed)) => return WaitResult::TimedOut,
                },
            }
        }
    }

    fn enter(&mut self, state: AgentState) {
        if self.state != state {
            tracing::trace!("{:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}
