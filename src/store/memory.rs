//! In-process store.
//!
//! Keeps every entity in a mutex-guarded vector. Useful for hosts without a
//! database and for asserting on what was written.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::audit::AuditRecord;
use crate::sms::tracker::DeliveryTracker;

use super::{Persist, StoreError};

#[derive(Debug, Default)]
struct Tables {
    audit: Vec<AuditRecord>,
    trackers: Vec<DeliveryTracker>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id = self.last_id.saturating_add(1);
        self.last_id
    }
}

/// Store holding records in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Snapshot of all audit records in write order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Lock`] if the store lock is poisoned.
    pub fn audit_records(&self) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self.lock()?.audit.clone())
    }

    /// Snapshot of all trackers in write order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Lock`] if the store lock is poisoned.
    pub fn trackers(&self) -> Result<Vec<DeliveryTracker>, StoreError> {
        Ok(self.lock()?.trackers.clone())
    }
}

fn upsert<T: Clone>(
    rows: &mut Vec<T>,
    table: &'static str,
    id: i64,
    entity: &T,
    id_of: impl Fn(&T) -> Option<i64>,
) -> Result<(), StoreError> {
    match rows.iter_mut().find(|row| id_of(row) == Some(id)) {
        Some(row) => {
            *row = entity.clone();
            Ok(())
        }
        None => Err(StoreError::NotFound { table, id }),
    }
}

#[async_trait]
impl Persist<AuditRecord> for MemoryStore {
    async fn persist(&self, record: &mut AuditRecord) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        match record.id {
            None => {
                record.id = Some(tables.next_id());
                tables.audit.push(record.clone());
                Ok(())
            }
            Some(id) => upsert(&mut tables.audit, "api_log", id, record, |r| r.id),
        }
    }
}

#[async_trait]
impl Persist<DeliveryTracker> for MemoryStore {
    async fn persist(&self, tracker: &mut DeliveryTracker) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        match tracker.id {
            None => {
                tracker.id = Some(tables.next_id());
                tables.trackers.push(tracker.clone());
                Ok(())
            }
            Some(id) => upsert(&mut tables.trackers, "sms_tracker", id, tracker, |t| t.id),
        }
    }
}
