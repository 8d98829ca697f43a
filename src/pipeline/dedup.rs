//! Double-report guard: at most one reading per customer, type and billing period.
//!
//! Two layers keep the invariant:
//! - an in-process in-flight set, so concurrent uploads for the same key are
//!   rejected before either reaches the extraction provider;
//! - the store's conditional insert, which stays authoritative across processes.

use crate::db::MeasureStore;
use crate::domain::{MeasureKey, MeasurementRecord};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("a reading already exists for {0}")]
    DoubleReport(MeasureKey),
    #[error("record {record} does not match reservation {reserved}")]
    KeyMismatch {
        reserved: MeasureKey,
        record: MeasureKey,
    },
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

type InFlight = Arc<Mutex<HashSet<MeasureKey>>>;

#[derive(Clone)]
pub struct DedupGuard {
    store: Arc<dyn MeasureStore>,
    in_flight: InFlight,
}

impl DedupGuard {
    pub fn new(store: Arc<dyn MeasureStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Claim `key` for this request.
    ///
    /// Fails with [`DedupError::DoubleReport`] if a reading is already stored
    /// for the key or another request currently holds it.
    pub async fn check_and_reserve(&self, key: MeasureKey) -> Result<Reservation, DedupError> {
        let slot = InFlightSlot::claim(&self.in_flight, key)?;

        if let Some(existing) = self.store.find(&slot.key).await? {
            debug!(
                key = %slot.key,
                existing_uuid = %existing.measure_uuid,
                "Reading already recorded for period"
            );
            return Err(DedupError::DoubleReport(slot.key.clone()));
        }

        Ok(Reservation {
            slot,
            store: self.store.clone(),
        })
    }

    /// Number of keys currently reserved.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A claimed key. Dropping it without [`Reservation::commit`] releases the
/// key and writes nothing.
pub struct Reservation {
    slot: InFlightSlot,
    store: Arc<dyn MeasureStore>,
}

impl Reservation {
    pub fn key(&self) -> &MeasureKey {
        &self.slot.key
    }

    pub async fn commit(self, record: &MeasurementRecord) -> Result<(), DedupError> {
        let record_key = record.key();
        if record_key != self.slot.key {
            return Err(DedupError::KeyMismatch {
                reserved: self.slot.key.clone(),
                record: record_key,
            });
        }

        if self.store.commit(record).await? {
            Ok(())
        } else {
            Err(DedupError::DoubleReport(record_key))
        }
    }
}

struct InFlightSlot {
    key: MeasureKey,
    in_flight: InFlight,
}

impl InFlightSlot {
    fn claim(in_flight: &InFlight, key: MeasureKey) -> Result<Self, DedupError> {
        let mut set = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(key.clone()) {
            debug!(key = %key, "Reading already in flight for period");
            return Err(DedupError::DoubleReport(key));
        }
        Ok(Self {
            key,
            in_flight: in_flight.clone(),
        })
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
