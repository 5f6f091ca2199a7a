//! Audit record entity and its status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Lifecycle status of an audit record.
///
/// `New` is written when the call starts; exactly one of the terminal
/// states follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// Call started, outcome unknown.
    #[default]
    New,
    /// Call returned successfully.
    Completed,
    /// Call failed.
    Failed,
}

impl AuditStatus {
    /// Returns the string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse from a stored text value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidValue`] if the value is not a known status.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "new" => Ok(Self::New),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(StoreError::InvalidValue {
                field: "status",
                value: other.to_owned(),
            }),
        }
    }

    /// Whether this status ends the lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Field-level mutation surface the audit logger needs from an entity.
///
/// Host applications with their own log tables implement this for their
/// entity type and hand the logger a factory producing fresh instances.
pub trait LogEntity: Send + Sync {
    /// Identity assigned by the store, `None` until first persisted.
    fn id(&self) -> Option<i64>;
    /// Set the operation tag (e.g. `"stripe.charge"`).
    fn set_kind(&mut self, kind: &str);
    /// Set the request payload.
    fn set_request(&mut self, request: serde_json::Value);
    /// Set the response payload.
    fn set_response(&mut self, response: serde_json::Value);
    /// Set the diagnostic message.
    fn set_message(&mut self, message: &str);
    /// Set the lifecycle status.
    fn set_status(&mut self, status: AuditStatus);
    /// Set the creation timestamp.
    fn set_created_at(&mut self, at: DateTime<Utc>);
}

/// One audited API call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Store-assigned identity.
    pub id: Option<i64>,
    /// Operation tag.
    pub kind: String,
    /// Lifecycle status.
    pub status: AuditStatus,
    /// Request payload as sent.
    pub request: Option<serde_json::Value>,
    /// Response payload as received.
    pub response: Option<serde_json::Value>,
    /// Error or diagnostic text.
    pub message: Option<String>,
    /// When the call started.
    pub created_at: Option<DateTime<Utc>>,
}

impl LogEntity for AuditRecord {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_kind(&mut self, kind: &str) {
        kind.clone_into(&mut self.kind);
    }

    fn set_request(&mut self, request: serde_json::Value) {
        self.request = Some(request);
    }

    fn set_response(&mut self, response: serde_json::Value) {
        self.response = Some(response);
    }

    fn set_message(&mut self, message: &str) {
        self.message = Some(message.to_owned());
    }

    fn set_status(&mut self, status: AuditStatus) {
        self.status = status;
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
    }
}
