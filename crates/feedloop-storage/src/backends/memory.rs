//! In-memory cooldown store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feedloop_core::Subject;
use tokio::sync::Mutex;

use crate::cooldown::CooldownStore;
use crate::Result;

/// Mutex-guarded map of last-fed timestamps.
///
/// The claim operation holds the lock across its read-check-write, which
/// gives the same atomicity guarantee as a database transaction.
#[derive(Default)]
pub struct MemoryCooldownStore {
    records: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryCooldownStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CooldownStore for MemoryCooldownStore {
    async fn initialize(&self, subjects: &[Subject], window: Duration) -> Result<()> {
        let seed = Utc::now() - window;
        let mut records = self.records.lock().await;
        for subject in subjects {
            records
                .entry(subject.as_str().to_string())
                .or_insert(seed);
        }
        Ok(())
    }

    async fn get(&self, subject: &Subject) -> Result<Option<DateTime<Utc>>> {
        Ok(self.records.lock().await.get(subject.as_str()).copied())
    }

    async fn set(&self, subject: &Subject, last_fed: DateTime<Utc>) -> Result<()> {
        self.records
            .lock()
            .await
            .insert(subject.as_str().to_string(), last_fed);
        Ok(())
    }

    async fn claim_if_elapsed(
        &self,
        subject: &Subject,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<bool> {
        let mut records = self.records.lock().await;
        let elapsed_ok = match records.get(subject.as_str()) {
            Some(last) => now.signed_duration_since(*last) >= window,
            None => true,
        };
        if elapsed_ok {
            records.insert(subject.as_str().to_string(), now);
        }
        Ok(elapsed_ok)
    }
}
