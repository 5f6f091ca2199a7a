//! API call audit logger.
//!
//! An [`ApiLogger`] tracks one call at a time: [`ApiLogger::log_start`]
//! writes a `new` record and keeps it as the current record, then exactly
//! one of [`ApiLogger::log_success`] / [`ApiLogger::log_error`] moves it to
//! its terminal state. Every call is a separate write to the store.
//!
//! A logger instance is single-writer. Concurrent operations each need
//! their own logger; the `&mut self` receivers enforce that.

pub mod record;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::store::{Persist, StoreError};

pub use self::record::{AuditRecord, AuditStatus, LogEntity};

/// Builds a fresh, unsaved entity for each [`ApiLogger::log_start`].
pub type EntityFactory<E> = Box<dyn Fn() -> E + Send + Sync>;

/// Records the start and outcome of outbound API calls.
pub struct ApiLogger<E: LogEntity> {
    clock: Arc<dyn Clock>,
    factory: EntityFactory<E>,
    current: Option<E>,
}

impl<E: LogEntity> std::fmt::Debug for ApiLogger<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiLogger")
            .field("in_flight", &self.current.is_some())
            .finish()
    }
}

impl ApiLogger<AuditRecord> {
    /// Logger writing stock [`AuditRecord`] entities.
    pub fn for_records(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, AuditRecord::default)
    }
}

impl Default for ApiLogger<AuditRecord> {
    fn default() -> Self {
        Self::for_records(Arc::new(SystemClock))
    }
}

impl<E: LogEntity> ApiLogger<E> {
    /// Create a logger producing entities with `factory`.
    pub fn new(clock: Arc<dyn Clock>, factory: impl Fn() -> E + Send + Sync + 'static) -> Self {
        Self {
            clock,
            factory: Box::new(factory),
            current: None,
        }
    }

    /// The record of the call in flight, if any.
    pub fn current(&self) -> Option<&E> {
        self.current.as_ref()
    }

    /// Record the start of a call.
    ///
    /// Builds a fresh entity, stamps it `new` with the operation tag, request
    /// payload and current time, persists it and keeps it as the current
    /// record. A previous record still in flight is abandoned in its `new`
    /// state and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails; no record is kept current.
    pub async fn log_start(
        &mut self,
        store: &dyn Persist<E>,
        kind: &str,
        request: serde_json::Value,
    ) -> Result<(), StoreError> {
        if let Some(abandoned) = self.current.take() {
            warn!(id = ?abandoned.id(), "api call started before previous call finished");
        }

        let mut entity = (self.factory)();
        entity.set_kind(kind);
        entity.set_request(request);
        entity.set_status(AuditStatus::New);
        entity.set_created_at(self.clock.now());

        store.persist(&mut entity).await?;
        debug!(kind, id = ?entity.id(), "api call started");

        self.current = Some(entity);
        Ok(())
    }

    /// Record a failed call.
    ///
    /// # Panics
    ///
    /// Panics with `"log is not created"` when no call is in flight: a
    /// terminal transition without a start is a caller bug.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails. The record stays current
    /// so the terminal call can be repeated.
    pub async fn log_error(
        &mut self,
        store: &dyn Persist<E>,
        message: &str,
        response: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut entity = self.take_current();
        entity.set_message(message);
        entity.set_response(response);
        entity.set_status(AuditStatus::Failed);

        self.finish(store, entity).await
    }

    /// Record a successful call.
    ///
    /// # Panics
    ///
    /// Panics with `"log is not created"` when no call is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails. The record stays current
    /// so the terminal call can be repeated.
    pub async fn log_success(
        &mut self,
        store: &dyn Persist<E>,
        response: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut entity = self.take_current();
        entity.set_status(AuditStatus::Completed);
        entity.set_response(response);

        self.finish(store, entity).await
    }

    fn take_current(&mut self) -> E {
        match self.current.take() {
            Some(entity) => entity,
            None => panic!("log is not created"),
        }
    }

    async fn finish(&mut self, store: &dyn Persist<E>, mut entity: E) -> Result<(), StoreError> {
        match store.persist(&mut entity).await {
            Ok(()) => {
                debug!(id = ?entity.id(), "api call finished");
                Ok(())
            }
            Err(e) => {
                self.current = Some(entity);
                Err(e)
            }
        }
    }
}
