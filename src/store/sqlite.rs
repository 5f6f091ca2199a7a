//! SQLite store backed by an sqlx connection pool.
//!
//! Timestamps are stored as RFC 3339 text and payloads as JSON text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, trace};

use crate::audit::{AuditRecord, AuditStatus};
use crate::config::DatabaseConfig;
use crate::sms::tracker::{DeliveryTracker, TrackerKind};

use super::{Persist, StoreError};

const SCHEMA: &str = include_str!("../../migrations/001_schema.sql");

/// Row type returned by SQLite queries for audit records.
type AuditRow = (
    i64,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

/// Row type returned by SQLite queries for trackers.
type TrackerRow = (
    i64,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
);

const TRACKER_COLUMNS: &str = "id, recipient, kind, text, primary_gateway, \
     primary_gateway_error, secondary_gateway, secondary_gateway_error, status, sent_at";

/// Relational store for audit records and delivery trackers.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a pool from config and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the URL is invalid, the pool cannot
    /// connect, or the schema fails to apply.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let opts: SqliteConnectOptions = config.url.parse()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(opts.create_if_missing(true))
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        info!(url = %config.url, "sqlite store ready");
        Ok(store)
    }

    /// Wrap an existing pool. The schema is not applied.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failure.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Load an audit record by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on SQLite failure or an unreadable row.
    pub async fn audit_record(&self, id: i64) -> Result<Option<AuditRecord>, StoreError> {
        let row: Option<AuditRow> = sqlx::query_as(
            "SELECT id, kind, status, request, response, message, created_at \
             FROM api_log WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(audit_from_row).transpose()
    }

    /// Load a tracker by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on SQLite failure or an unreadable row.
    pub async fn tracker(&self, id: i64) -> Result<Option<DeliveryTracker>, StoreError> {
        let row: Option<TrackerRow> = sqlx::query_as(&format!(
            "SELECT {TRACKER_COLUMNS} FROM sms_tracker WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(tracker_from_row).transpose()
    }

    /// All trackers for `recipient`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on SQLite failure or an unreadable row.
    pub async fn trackers_for(&self, recipient: &str) -> Result<Vec<DeliveryTracker>, StoreError> {
        let rows: Vec<TrackerRow> = sqlx::query_as(&format!(
            "SELECT {TRACKER_COLUMNS} FROM sms_tracker WHERE recipient = ?1 ORDER BY id"
        ))
        .bind(recipient)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(tracker_from_row).collect()
    }
}

#[async_trait]
impl Persist<AuditRecord> for SqliteStore {
    async fn persist(&self, record: &mut AuditRecord) -> Result<(), StoreError> {
        let request = record.request.as_ref().map(serde_json::to_string).transpose()?;
        let response = record.response.as_ref().map(serde_json::to_string).transpose()?;
        let created_at = record.created_at.map(|at| at.to_rfc3339());

        match record.id {
            None => {
                let id: i64 = sqlx::query_scalar(
                    "INSERT INTO api_log (kind, status, request, response, message, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING id",
                )
                .bind(&record.kind)
                .bind(record.status.as_str())
                .bind(request)
                .bind(response)
                .bind(&record.message)
                .bind(created_at)
                .fetch_one(&self.pool)
                .await?;
                record.id = Some(id);
            }
            Some(id) => {
                let result = sqlx::query(
                    "UPDATE api_log SET kind = ?1, status = ?2, request = ?3, response = ?4, \
                     message = ?5, created_at = ?6 WHERE id = ?7",
                )
                .bind(&record.kind)
                .bind(record.status.as_str())
                .bind(request)
                .bind(response)
                .bind(&record.message)
                .bind(created_at)
                .bind(id)
                .execute(&self.pool)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::NotFound {
                        table: "api_log",
                        id,
                    });
                }
            }
        }

        trace!(id = ?record.id, status = record.status.as_str(), "api_log row written");
        Ok(())
    }
}

#[async_trait]
impl Persist<DeliveryTracker> for SqliteStore {
    async fn persist(&self, tracker: &mut DeliveryTracker) -> Result<(), StoreError> {
        let sent_at = tracker.sent_at.to_rfc3339();

        match tracker.id {
            None => {
                let id: i64 = sqlx::query_scalar(
                    "INSERT INTO sms_tracker (recipient, kind, text, primary_gateway, \
                     primary_gateway_error, secondary_gateway, secondary_gateway_error, \
                     status, sent_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING id",
                )
                .bind(&tracker.recipient)
                .bind(tracker.kind.as_str())
                .bind(&tracker.text)
                .bind(&tracker.primary_gateway)
                .bind(&tracker.primary_gateway_error)
                .bind(&tracker.secondary_gateway)
                .bind(&tracker.secondary_gateway_error)
                .bind(&tracker.status)
                .bind(sent_at)
                .fetch_one(&self.pool)
                .await?;
                tracker.id = Some(id);
            }
            Some(id) => {
                let result = sqlx::query(
                    "UPDATE sms_tracker SET recipient = ?1, kind = ?2, text = ?3, \
                     primary_gateway = ?4, primary_gateway_error = ?5, secondary_gateway = ?6, \
                     secondary_gateway_error = ?7, status = ?8, sent_at = ?9 WHERE id = ?10",
                )
                .bind(&tracker.recipient)
                .bind(tracker.kind.as_str())
                .bind(&tracker.text)
                .bind(&tracker.primary_gateway)
                .bind(&tracker.primary_gateway_error)
                .bind(&tracker.secondary_gateway)
                .bind(&tracker.secondary_gateway_error)
                .bind(&tracker.status)
                .bind(sent_at)
                .bind(id)
                .execute(&self.pool)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::NotFound {
                        table: "sms_tracker",
                        id,
                    });
                }
            }
        }

        trace!(id = ?tracker.id, kind = tracker.kind.as_str(), "sms_tracker row written");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────

fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidValue {
            field,
            value: raw.to_owned(),
        })
}

fn parse_payload(raw: Option<String>) -> Result<Option<serde_json::Value>, StoreError> {
    raw.as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(StoreError::from)
}

fn audit_from_row(row: AuditRow) -> Result<AuditRecord, StoreError> {
    let (id, kind, status, request, response, message, created_at) = row;
    Ok(AuditRecord {
        id: Some(id),
        kind,
        status: AuditStatus::parse(&status)?,
        request: parse_payload(request)?,
        response: parse_payload(response)?,
        message,
        created_at: Some(parse_timestamp("created_at", &created_at)?),
    })
}

fn tracker_from_row(row: TrackerRow) -> Result<DeliveryTracker, StoreError> {
    let (
        id,
        recipient,
        kind,
        text,
        primary_gateway,
        primary_gateway_error,
        secondary_gateway,
        secondary_gateway_error,
        status,
        sent_at,
    ) = row;
    Ok(DeliveryTracker {
        id: Some(id),
        recipient,
        kind: TrackerKind::parse(&kind)?,
        text,
        primary_gateway,
        primary_gateway_error,
        secondary_gateway,
        secondary_gateway_error,
        status,
        sent_at: parse_timestamp("sent_at", &sent_at)?,
    })
}
