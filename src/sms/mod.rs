//! SMS and voice delivery with a primary/secondary gateway fallback.
//!
//! Callers build an [`Otp`] or [`Message`] naming a [`ProviderPair`] and hand
//! it to [`sender::Sender`]. The sender resolves gateways from an immutable
//! [`registry::GatewayRegistry`], tries the primary, falls back to the
//! secondary once on failure, and persists one
//! [`tracker::DeliveryTracker`] describing the attempt.
//!
//! Delivery failures never surface as errors: they are recorded on the
//! tracker. Only a gateway name missing from the registry (or a failed
//! tracker write) is returned to the caller.

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

pub mod gateway;
pub mod registry;
pub mod sender;
pub mod template;
pub mod tracker;

/// Names of the gateways to try, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPair {
    /// Gateway tried first.
    pub primary: String,
    /// Gateway tried once when the primary fails.
    pub secondary: String,
}

impl ProviderPair {
    /// Pair `primary` with `secondary`.
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }
}

/// One-time password delivered by SMS or voice callout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Otp {
    /// Recipient phone number.
    pub number: String,
    /// Message template with a `%s` placeholder for the code.
    pub template: String,
    /// The code itself.
    pub code: String,
    /// Rendered outbound text. Filled in by the sender before dispatch.
    #[serde(default)]
    pub text: String,
    /// Gateways to use.
    pub provider: ProviderPair,
}

impl Otp {
    /// Build an OTP payload; `text` is rendered at dispatch time.
    pub fn new(
        number: impl Into<String>,
        template: impl Into<String>,
        code: impl Into<String>,
        provider: ProviderPair,
    ) -> Self {
        Self {
            number: number.into(),
            template: template.into(),
            code: code.into(),
            text: String::new(),
            provider,
        }
    }

    /// Render `template` with `code` into `text`.
    pub fn render(&mut self) -> &str {
        self.text = template::render(&self.template, &self.code);
        &self.text
    }
}

/// Free-form SMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Recipient phone number.
    pub number: String,
    /// Message body.
    pub text: String,
    /// Gateways to use.
    pub provider: ProviderPair,
}

impl Message {
    /// Build a plain message payload.
    pub fn new(number: impl Into<String>, text: impl Into<String>, provider: ProviderPair) -> Self {
        Self {
            number: number.into(),
            text: text.into(),
            provider,
        }
    }
}

/// Errors returned by a dispatch call.
///
/// Gateway delivery failures are not in this list: they are recorded on the
/// tracker instead.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The primary gateway name is not registered. Nothing was sent or stored.
    #[error("primary provider not supported: {provider}")]
    PrimaryUnsupported {
        /// Unregistered name.
        provider: String,
    },

    /// The primary failed and the secondary name is not registered.
    /// The tracker for this attempt is discarded.
    #[error("secondary provider not supported: {provider}")]
    SecondaryUnsupported {
        /// Unregistered name.
        provider: String,
    },

    /// The tracker row could not be written.
    #[error("failed to record delivery: {0}")]
    Store(#[from] StoreError),
}
