//! Cloud-side decision pipeline for Feedloop.
//!
//! Combines an opaque classifier capability with the persisted cooldown
//! state to produce an idempotent, always-answered feeding decision per
//! classified frame, and publishes it on the response topic.

pub mod classifier;
pub mod engine;
pub mod fetcher;
pub mod service;
pub mod worker;

pub use classifier::{Classifier, HttpClassifier};
pub use engine::DecisionEngine;
pub use fetcher::{object_url, HttpImageFetcher, ImageFetcher};
pub use service::DecisionService;
pub use worker::RequestWorker;
