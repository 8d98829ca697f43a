//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and migrations
//! - `Repository`, the persistent store of committed readings
//! - `MeasureStore`, the interface the deduplication guard depends on

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;

use crate::domain::{MeasureKey, MeasurementRecord};
use async_trait::async_trait;

/// Store of committed readings, keyed by customer, type and billing period.
#[async_trait]
pub trait MeasureStore: Send + Sync {
    async fn find(&self, key: &MeasureKey) -> Result<Option<MeasurementRecord>, sqlx::Error>;

    /// Atomic conditional insert. Returns `false` when the key is already taken.
    async fn commit(&self, record: &MeasurementRecord) -> Result<bool, sqlx::Error>;
}
