//! Full-loop coordination test: the capture agent and the decision
//! worker wired over the in-process channel, with every external
//! capability mocked.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;
use feedloop_agent::{Actuator, CaptureAgent, CycleOutcome, FrameSource, ImageRef};
use feedloop_channel::LocalChannel;
use feedloop_cloud::{Classifier, DecisionEngine, DecisionService, ImageFetcher, RequestWorker};
use feedloop_core::config::{AgentConfig, DecisionConfig, TopicConfig};
use feedloop_core::{ClassificationResult, Subject, SubjectCatalog};
use feedloop_storage::{CooldownStore, MemoryCooldownStore};
use tokio::sync::watch;

struct FixedClassifier {
    label: String,
    confidence: f64,
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, _image: &[u8]) -> feedloop_core::Result<ClassificationResult> {
        Ok(ClassificationResult::new(
            self.label.clone(),
            self.confidence,
        ))
    }
}

struct FixedFetcher;

#[async_trait]
impl ImageFetcher for FixedFetcher {
    async fn fetch(&self, _image_url: &str) -> feedloop_core::Result<Vec<u8>> {
        Ok(vec![0u8; 16])
    }
}

struct FixedFrameSource;

#[async_trait]
impl FrameSource for FixedFrameSource {
    async fn acquire(&self) -> feedloop_core::Result<ImageRef> {
        Ok(ImageRef::new(
            "https://petimagestorage.s3.us-east-1.amazonaws.com/frame.jpg",
        ))
    }
}

#[derive(Default)]
struct CountingActuator {
    activations: AtomicUsize,
}

#[async_trait]
impl Actuator for CountingActuator {
    async fn activate(&self) -> feedloop_core::Result<()> {
        self.activations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_full_loop_feeds_once_then_respects_cooldown() {
    let channel = Arc::new(LocalChannel::new());
    let store = Arc::new(MemoryCooldownStore::new());
    store
        .initialize(
            &[Subject::new("Pet1"), Subject::new("Pet2")],
            Duration::hours(4),
        )
        .await
        .unwrap();

    // Decision side.
    let engine = DecisionEngine::new(
        store.clone(),
        SubjectCatalog::default(),
        DecisionConfig::default(),
    );
    let service = Arc::new(DecisionService::new(
        Arc::new(FixedClassifier {
            label: "Pet1".to_string(),
            confidence: 0.92,
        }),
        Arc::new(FixedFetcher),
        engine,
        channel.clone(),
        TopicConfig::default(),
        "us-east-1",
    ));
    let worker = RequestWorker::new(
        service,
        channel.clone(),
        TopicConfig::default(),
        Arc::new(FixedFetcher),
    );
    let (worker_tx, worker_shutdown) = watch::channel(false);
    let worker_handle = tokio::spawn(async move { worker.run(worker_shutdown).await });

    // Let the worker subscribe before the first request goes out.
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    // Edge side.
    let actuator = Arc::new(CountingActuator::default());
    let mut agent = CaptureAgent::new(
        channel.clone(),
        Arc::new(FixedFrameSource),
        actuator.clone(),
        TopicConfig::default(),
        AgentConfig {
            cycle_period: 0,
            response_timeout: 5,
            ..AgentConfig::default()
        },
    );
    let (_agent_tx, mut agent_shutdown) = watch::channel(false);

    // The seeded record is exactly one window old: first sighting feeds.
    let outcome = agent.run_cycle(&mut agent_shutdown).await;
    assert_eq!(outcome, CycleOutcome::Fed);
    assert_eq!(actuator.activations.load(Ordering::SeqCst), 1);

    // Seconds later the same subject is inside the window: answered,
    // definitively, with no feeding.
    let outcome = agent.run_cycle(&mut agent_shutdown).await;
    assert_eq!(outcome, CycleOutcome::NotFed);
    assert_eq!(actuator.activations.load(Ordering::SeqCst), 1);

    worker_tx.send(true).unwrap();
    worker_handle.await.unwrap().unwrap();
}
