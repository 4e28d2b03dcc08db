//! End-to-end decision pipeline tests over the in-process channel.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feedloop_channel::{LocalChannel, MessageChannel};
use feedloop_cloud::{Classifier, DecisionEngine, DecisionService, ImageFetcher, RequestWorker};
use feedloop_core::config::{DecisionConfig, TopicConfig};
use feedloop_core::{
    ClassificationResult, FeedRequest, FeedingDecision, StorageEvent, Subject, SubjectCatalog,
};
use feedloop_storage::{CooldownStore, MemoryCooldownStore};

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

struct FailingStore;

#[async_trait]
impl CooldownStore for FailingStore {
    async fn initialize(
        &self,
        _subjects: &[Subject],
        _window: Duration,
    ) -> feedloop_storage::Result<()> {
        Err(feedloop_storage::Error::Storage("unavailable".to_string()))
    }

    async fn get(&self, _subject: &Subject) -> feedloop_storage::Result<Option<DateTime<Utc>>> {
        Err(feedloop_storage::Error::Storage("unavailable".to_string()))
    }

    async fn set(
        &self,
        _subject: &Subject,
        _last_fed: DateTime<Utc>,
    ) -> feedloop_storage::Result<()> {
        Err(feedloop_storage::Error::Storage("unavailable".to_string()))
    }

    async fn claim_if_elapsed(
        &self,
        _subject: &Subject,
        _now: DateTime<Utc>,
        _window: Duration,
    ) -> feedloop_storage::Result<bool> {
        Err(feedloop_storage::Error::Storage("unavailable".to_string()))
    }
}

fn build_service(
    store: Arc<dyn CooldownStore>,
    channel: Arc<LocalChannel>,
    label: &str,
    confidence: f64,
) -> DecisionService {
    let engine = DecisionEngine::new(store, SubjectCatalog::default(), DecisionConfig::default());
    DecisionService::new(
        Arc::new(FixedClassifier {
            label: label.to_string(),
            confidence,
        }),
        Arc::new(FixedFetcher),
        engine,
        channel,
        TopicConfig::default(),
        "us-east-1",
    )
}

#[tokio::test]
async fn test_storage_event_feeds_and_publishes() {
    let channel = Arc::new(LocalChannel::new());
    let store = Arc::new(MemoryCooldownStore::new());
    store
        .set(&Subject::new("Pet1"), Utc::now() - Duration::hours(12))
        .await
        .unwrap();

    let service = build_service(store, channel.clone(), "Pet1", 0.92);
    let mut responses = channel.subscribe("pet/dispenser/command").await.unwrap();

    let result = service
        .handle_storage_event(&StorageEvent::new("petimagestorage", "frame.jpg"))
        .await;
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["statusCode"], 200);
    assert_eq!(json["body"]["pet_name"], "Pet1");
    assert_eq!(json["body"]["confidence"], 0.92);
    assert_eq!(json["body"]["fed"], true);

    let message = responses.recv().await.unwrap();
    assert_eq!(message.topic, "pet/dispenser/command");
    let decision: FeedingDecision = message.decode().unwrap();
    assert_eq!(decision.recognized_label, Subject::new("Pet1"));
    assert_eq!(decision.confidence_score, 0.92);
    assert!(decision.fed);
}

#[tokio::test]
async fn test_second_event_within_cooldown_not_fed() {
    let channel = Arc::new(LocalChannel::new());
    let store = Arc::new(MemoryCooldownStore::new());
    let service = build_service(store, channel.clone(), "Pet1", 0.92);

    let event = StorageEvent::new("petimagestorage", "frame.jpg");
    let first = service.handle_storage_event(&event).await;
    assert_eq!(serde_json::to_value(&first).unwrap()["body"]["fed"], true);

    // Same subject again, seconds later: inside the window.
    let second = service.handle_storage_event(&event).await;
    assert_eq!(serde_json::to_value(&second).unwrap()["body"]["fed"], false);
}

#[tokio::test]
async fn test_store_failure_answers_generic_and_fails_closed() {
    let channel = Arc::new(LocalChannel::new());
    let service = build_service(Arc::new(FailingStore), channel.clone(), "Pet1", 0.92);
    let mut responses = channel.subscribe("pet/dispenser/command").await.unwrap();

    let result = service
        .handle_storage_event(&StorageEvent::new("petimagestorage", "frame.jpg"))
        .await;
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["statusCode"], 500);
    assert_eq!(json["body"], "Error processing request");

    // The agent still receives a definitive negative answer.
    let message = responses.recv().await.unwrap();
    let decision: FeedingDecision = message.decode().unwrap();
    assert!(!decision.fed);
}

#[tokio::test]
async fn test_worker_answers_requests_with_correlation() {
    let channel = Arc::new(LocalChannel::new());
    let store = Arc::new(MemoryCooldownStore::new());
    let service = Arc::new(build_service(store, channel.clone(), "Pet1", 0.92));

    let worker = RequestWorker::new(
        service,
        channel.clone(),
        TopicConfig::default(),
        Arc::new(FixedFetcher),
    );
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    // Let the worker subscribe before publishing.
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    let mut responses = channel.subscribe("pet/dispenser/command").await.unwrap();
    let request = FeedRequest::new("https://petimagestorage.s3.us-east-1.amazonaws.com/a.jpg");
    channel
        .publish(
            "pet/dispenser/image",
            serde_json::to_vec(&request).unwrap(),
        )
        .await
        .unwrap();

    let message = tokio::time::timeout(StdDuration::from_secs(2), async {
        loop {
            let message = responses.recv().await.unwrap();
            if message.topic == "pet/dispenser/command" {
                return message;
            }
        }
    })
    .await
    .expect("worker should answer within the deadline");

    let decision: FeedingDecision = message.decode().unwrap();
    assert_eq!(decision.request_id, Some(request.request_id));
    assert!(decision.fed);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();
}
