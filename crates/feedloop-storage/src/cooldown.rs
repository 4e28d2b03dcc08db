//! The cooldown store contract.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feedloop_core::Subject;

use crate::Result;

/// Per-subject last-fed timestamps.
///
/// Records are created at initialization for every known subject and are
/// never deleted. An absent record means "never acted" and is older than
/// any cooldown window. Only a positive feeding decision mutates a
/// record, and only through [`claim_if_elapsed`](Self::claim_if_elapsed),
/// which performs the read-check-write as one atomic unit: two
/// overlapping claims for the same subject cannot both observe the same
/// stale timestamp and both succeed.
#[async_trait]
pub trait CooldownStore: Send + Sync {
    /// Seed a record for any subject that does not have one yet, with a
    /// timestamp of `now - window` so the first ever sighting qualifies.
    /// Idempotent: existing records are never overwritten.
    async fn initialize(&self, subjects: &[Subject], window: Duration) -> Result<()>;

    /// Last-fed timestamp for the subject, if any record exists.
    async fn get(&self, subject: &Subject) -> Result<Option<DateTime<Utc>>>;

    /// Unconditional overwrite of the subject's last-fed timestamp.
    async fn set(&self, subject: &Subject, last_fed: DateTime<Utc>) -> Result<()>;

    /// Atomically check the cooldown and claim the feeding slot.
    ///
    /// Returns `true` and records `now` iff the subject has no record or
    /// `now - last >= window`. Returns `false` and leaves the record
    /// untouched otherwise.
    async fn claim_if_elapsed(
        &self,
        subject: &Subject,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<bool>;
}
