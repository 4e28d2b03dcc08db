//! Redb-backed cooldown store.
//!
//! One JSON record per subject in a single table. Claims run inside one
//! write transaction, so the read-check-write is atomic: redb serializes
//! writers, and a concurrent claim for the same subject sees the
//! committed timestamp, not the stale one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feedloop_core::{CooldownRecord, Subject};
use redb::{Database, ReadableTable, TableDefinition};

use crate::cooldown::CooldownStore;
use crate::Result;

const COOLDOWN_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("cooldown");

/// Persistent cooldown store.
pub struct RedbCooldownStore {
    db: Arc<Database>,
    /// Backing file for in-memory instances (temp-dir file, unique name).
    temp_path: Option<PathBuf>,
}

impl RedbCooldownStore {
    /// Open or create a store at the given path, creating parent
    /// directories as needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = if path.exists() {
            Database::open(path)?
        } else {
            Database::create(path)?
        };

        let store = Self {
            db: Arc::new(db),
            temp_path: None,
        };
        store.ensure_table()?;
        Ok(store)
    }

    /// In-memory variant for tests and ephemeral deployments.
    ///
    /// redb has no true in-memory mode; this uses a uniquely named file in
    /// the system temp directory.
    pub fn memory() -> Result<Self> {
        let temp_path =
            std::env::temp_dir().join(format!("cooldown_{}.redb", uuid::Uuid::new_v4()));
        let db = Database::create(&temp_path)?;

        let store = Self {
            db: Arc::new(db),
            temp_path: Some(temp_path),
        };
        store.ensure_table()?;
        Ok(store)
    }

    /// Path of the backing file when running in temp-file mode.
    pub fn temp_path(&self) -> Option<&Path> {
        self.temp_path.as_deref()
    }

    // A read against a fresh database would otherwise fail with a
    // missing-table error.
    fn ensure_table(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        txn.open_table(COOLDOWN_TABLE)?;
        txn.commit()?;
        Ok(())
    }

    fn encode(subject: &Subject, last_fed: DateTime<Utc>) -> Result<Vec<u8>> {
        let record = CooldownRecord::new(subject, last_fed);
        Ok(serde_json::to_vec(&record)?)
    }

    fn decode(raw: &[u8]) -> Result<DateTime<Utc>> {
        let record: CooldownRecord = serde_json::from_slice(raw)?;
        Ok(record.last_fed_time)
    }
}

#[async_trait]
impl CooldownStore for RedbCooldownStore {
    async fn initialize(&self, subjects: &[Subject], window: Duration) -> Result<()> {
        let seed = Utc::now() - window;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(COOLDOWN_TABLE)?;
            for subject in subjects {
                let existing = table.get(subject.as_str())?.is_some();
                if !existing {
                    let raw = Self::encode(subject, seed)?;
                    table.insert(subject.as_str(), raw.as_slice())?;
                    tracing::debug!("Seeded cooldown record for {}", subject);
                }
            }
        }
        txn.commit()?;
        Ok(())
    }

    async fn get(&self, subject: &Subject) -> Result<Option<DateTime<Utc>>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(COOLDOWN_TABLE)?;
        match table.get(subject.as_str())? {
            Some(raw) => Ok(Some(Self::decode(raw.value())?)),
            None => Ok(None),
        }
    }

    async fn set(&self, subject: &Subject, last_fed: DateTime<Utc>) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(COOLDOWN_TABLE)?;
            let raw = Self::encode(subject, last_fed)?;
            table.insert(subject.as_str(), raw.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    async fn claim_if_elapsed(
        &self,
        subject: &Subject,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let claimed;
        {
            let mut table = txn.open_table(COOLDOWN_TABLE)?;
            let elapsed_ok = match table.get(subject.as_str())? {
                Some(raw) => {
                    let last = Self::decode(raw.value())?;
                    now.signed_duration_since(last) >= window
                }
                None => true,
            };
            if elapsed_ok {
                let raw = Self::encode(subject, now)?;
                table.insert(subject.as_str(), raw.as_slice())?;
            }
            claimed = elapsed_ok;
        }
        txn.commit()?;
        Ok(claimed)
    }
}
