//! Cooldown persistence for Feedloop.
//!
//! One record per subject holding the last time a positive feeding
//! decision was taken. The store exposes an atomic check-and-claim so two
//! overlapping decisions for the same subject can never both pass the
//! cooldown gate against the same stale record.

pub mod backends;
pub mod cooldown;
pub mod error;

pub use backends::memory::MemoryCooldownStore;
pub use backends::redb::RedbCooldownStore;
pub use cooldown::CooldownStore;
pub use error::{Error, Result};
