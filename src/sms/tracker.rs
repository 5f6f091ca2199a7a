//! Delivery tracker: one row per dispatch, covering the fallback attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::{Persist, StoreError};

/// Channel a tracked message went out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    /// Text message.
    Sms,
    /// Voice callout.
    Callout,
}

impl TrackerKind {
    /// Returns the string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Callout => "callout",
        }
    }

    /// Parse from a stored text value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidValue`] if the value is not a known kind.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "sms" => Ok(Self::Sms),
            "callout" => Ok(Self::Callout),
            other => Err(StoreError::InvalidValue {
                field: "kind",
                value: other.to_owned(),
            }),
        }
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTracker {
    /// Store-assigned identity.
    pub id: Option<i64>,
    /// Recipient phone number.
    pub recipient: String,
    /// Channel.
    pub kind: TrackerKind,
    /// Rendered text sent to the recipient.
    pub text: String,
    /// Gateway tried first.
    pub primary_gateway: String,
    /// Error reported by the primary gateway.
    pub primary_gateway_error: Option<String>,
    /// Gateway used for the fallback, if one ran.
    pub secondary_gateway: Option<String>,
    /// Error reported by the secondary gateway.
    pub secondary_gateway_error: Option<String>,
    /// Status returned by the last gateway called.
    pub status: String,
    /// When the dispatch started.
    pub sent_at: DateTime<Utc>,
}

impl DeliveryTracker {
    /// Start a tracker for a dispatch through `primary_gateway`.
    pub fn new(
        recipient: impl Into<String>,
        kind: TrackerKind,
        text: impl Into<String>,
        primary_gateway: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            recipient: recipient.into(),
            kind,
            text: text.into(),
            primary_gateway: primary_gateway.into(),
            primary_gateway_error: None,
            secondary_gateway: None,
            secondary_gateway_error: None,
            status: String::new(),
            sent_at,
        }
    }

    /// Whether the secondary gateway was tried.
    pub fn used_fallback(&self) -> bool {
        self.secondary_gateway.is_some()
    }

    /// Whether the last gateway called reported no error.
    pub fn delivered(&self) -> bool {
        match &self.secondary_gateway {
            Some(_) => self.secondary_gateway_error.is_none(),
            None => self.primary_gateway_error.is_none(),
        }
    }
}

/// Persist a finished tracker.
///
/// # Errors
///
/// Returns [`StoreError`] if the write fails.
pub async fn record(
    store: &dyn Persist<DeliveryTracker>,
    tracker: &mut DeliveryTracker,
) -> Result<(), StoreError> {
    if let Err(e) = store.persist(tracker).await {
        warn!(recipient = %tracker.recipient, error = %e, "failed to record delivery");
        return Err(e);
    }
    debug!(
        id = ?tracker.id,
        kind = tracker.kind.as_str(),
        status = %tracker.status,
        fallback = tracker.used_fallback(),
        "delivery recorded"
    );
    Ok(())
}
