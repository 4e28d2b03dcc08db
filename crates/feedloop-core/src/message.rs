//! Wire payloads and persisted records.
//!
//! Field names on the wire are pinned with explicit serde attributes:
//! external consumers (the inference pipeline, the cloud trigger, legacy
//! device firmware) parse these by name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::Subject;

/// Request published by the capture agent on the request topic.
///
/// `image_url` is an opaque reference to image bytes resolvable by the
/// inference pipeline. `request_id` correlates the eventual decision back
/// to the cycle that asked for it, so a stale or mismatched response can
/// be discarded instead of acted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRequest {
    pub image_url: String,
    pub request_id: Uuid,
}

impl FeedRequest {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            request_id: Uuid::new_v4(),
        }
    }
}

/// Classification produced by the classifier: one label and its
/// confidence in `[0, 1]`. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Subject,
    pub confidence: f64,
}

impl ClassificationResult {
    pub fn new(label: impl Into<Subject>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Decision published on the response topic.
///
/// Always emitted, even when `fed == false` — the capture agent must
/// receive a definitive answer every cycle, never a silent drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingDecision {
    pub recognized_label: Subject,
    pub confidence_score: f64,
    pub fed: bool,

    /// Echoed from the request when known; absent for legacy emitters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
}

impl FeedingDecision {
    /// A negative decision: the subject is not fed this cycle.
    pub fn denied(label: Subject, confidence: f64) -> Self {
        Self {
            recognized_label: label,
            confidence_score: confidence,
            fed: false,
            request_id: None,
        }
    }

    /// A positive decision: the actuator should fire.
    pub fn granted(label: Subject, confidence: f64) -> Self {
        Self {
            recognized_label: label,
            confidence_score: confidence,
            fed: true,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

/// Storage-event-style notification identifying a stored image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEvent {
    pub bucket: String,
    pub key: String,
}

impl StorageEvent {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Structured result returned by the cloud entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: InvocationBody,
}

/// Body of an invocation result: a decision summary on success, a generic
/// message on failure. Internal error detail is never placed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvocationBody {
    Decision {
        pet_name: Subject,
        confidence: f64,
        fed: bool,
    },
    Message(String),
}

impl InvocationResult {
    /// Success result summarizing the decision.
    pub fn ok(decision: &FeedingDecision) -> Self {
        Self {
            status_code: 200,
            body: InvocationBody::Decision {
                pet_name: decision.recognized_label.clone(),
                confidence: decision.confidence_score,
                fed: decision.fed,
            },
        }
    }

    /// Generic failure result. Deliberately carries no internal detail.
    pub fn failure() -> Self {
        Self {
            status_code: 500,
            body: InvocationBody::Message("Error processing request".to_string()),
        }
    }
}

/// Persisted cooldown record: one per subject, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownRecord {
    #[serde(rename = "subjectId")]
    pub subject_id: String,

    #[serde(rename = "lastFedTime")]
    pub last_fed_time: DateTime<Utc>,
}

impl CooldownRecord {
    pub fn new(subject: &Subject, last_fed_time: DateTime<Utc>) -> Self {
        Self {
            subject_id: subject.as_str().to_string(),
            last_fed_time,
        }
    }
}
