//! Gateway abstraction over carrier-specific SMS/voice clients.
//!
//! Concrete clients live in the host application; this crate only consumes
//! the [`Gateway`] trait. A [`Request`] names the gateway method and carries
//! its payload, so the fallback logic is written once and an operation can
//! never be paired with the wrong payload.

use async_trait::async_trait;

use super::tracker::TrackerKind;
use super::{Message, Otp};

/// Failure reported by a gateway call.
///
/// Carries the status the provider returned alongside the error, which the
/// sender still records when no fallback replaces it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct GatewayError {
    /// Diagnostic text recorded on the tracker.
    pub message: String,
    /// Delivery status reported with the failure, empty when none.
    pub status: String,
}

impl GatewayError {
    /// Failure with no reported status.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: String::new(),
        }
    }

    /// Attach the status the provider reported.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

/// A carrier client able to deliver messages and verify codes.
///
/// Every method returns the provider's delivery status on success.
/// Implementations must be `Send + Sync`; one instance serves all dispatches.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send an OTP by SMS.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the provider rejects or fails the send.
    async fn send_otp_sms(&self, otp: &Otp) -> Result<String, GatewayError>;

    /// Read an OTP out in a voice callout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the provider rejects or fails the call.
    async fn send_otp_callout(&self, otp: &Otp) -> Result<String, GatewayError>;

    /// Send a free-form SMS.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the provider rejects or fails the send.
    async fn send_sms_message(&self, message: &Message) -> Result<String, GatewayError>;

    /// Start a provider-managed verification by SMS.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the provider rejects or fails the send.
    async fn send_verification_sms(&self, otp: &Otp) -> Result<String, GatewayError>;

    /// Start a provider-managed verification by voice callout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the provider rejects or fails the call.
    async fn send_verification_callout(&self, otp: &Otp) -> Result<String, GatewayError>;

    /// Check a code against a provider-managed verification.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the provider rejects the check.
    async fn verify_code(&self, otp: &Otp) -> Result<String, GatewayError>;
}

/// Which gateway method a dispatch invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`Gateway::send_otp_sms`].
    OtpSms,
    /// [`Gateway::send_otp_callout`].
    OtpCallout,
    /// [`Gateway::send_sms_message`].
    SmsMessage,
    /// [`Gateway::send_verification_sms`].
    VerificationSms,
    /// [`Gateway::send_verification_callout`].
    VerificationCallout,
    /// [`Gateway::verify_code`].
    VerifyCode,
}

impl Operation {
    /// Tracker kind recorded for this operation.
    pub fn tracker_kind(&self) -> TrackerKind {
        match self {
            Self::OtpCallout | Self::VerificationCallout => TrackerKind::Callout,
            Self::OtpSms | Self::SmsMessage | Self::VerificationSms | Self::VerifyCode => {
                TrackerKind::Sms
            }
        }
    }

    /// Stable name used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OtpSms => "otp_sms",
            Self::OtpCallout => "otp_callout",
            Self::SmsMessage => "sms_message",
            Self::VerificationSms => "verification_sms",
            Self::VerificationCallout => "verification_callout",
            Self::VerifyCode => "verify_code",
        }
    }
}

/// Operations that carry an [`Otp`].
///
/// Narrower than [`Operation`]: plain messages cannot be selected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpOperation {
    /// [`Gateway::send_otp_sms`].
    OtpSms,
    /// [`Gateway::send_otp_callout`].
    OtpCallout,
    /// [`Gateway::send_verification_sms`].
    VerificationSms,
    /// [`Gateway::send_verification_callout`].
    VerificationCallout,
    /// [`Gateway::verify_code`].
    VerifyCode,
}

impl OtpOperation {
    /// Every OTP operation.
    pub const ALL: [Self; 5] = [
        Self::OtpSms,
        Self::OtpCallout,
        Self::VerificationSms,
        Self::VerificationCallout,
        Self::VerifyCode,
    ];

    /// Pair this operation with its payload.
    pub fn request(self, otp: &Otp) -> Request<'_> {
        match self {
            Self::OtpSms => Request::OtpSms(otp),
            Self::OtpCallout => Request::OtpCallout(otp),
            Self::VerificationSms => Request::VerificationSms(otp),
            Self::VerificationCallout => Request::VerificationCallout(otp),
            Self::VerifyCode => Request::VerifyCode(otp),
        }
    }
}

impl From<OtpOperation> for Operation {
    fn from(operation: OtpOperation) -> Self {
        match operation {
            OtpOperation::OtpSms => Self::OtpSms,
            OtpOperation::OtpCallout => Self::OtpCallout,
            OtpOperation::VerificationSms => Self::VerificationSms,
            OtpOperation::VerificationCallout => Self::VerificationCallout,
            OtpOperation::VerifyCode => Self::VerifyCode,
        }
    }
}

/// A gateway call together with its payload.
#[derive(Debug, Clone, Copy)]
pub enum Request<'a> {
    /// [`Gateway::send_otp_sms`].
    OtpSms(&'a Otp),
    /// [`Gateway::send_otp_callout`].
    OtpCallout(&'a Otp),
    /// [`Gateway::send_sms_message`].
    SmsMessage(&'a Message),
    /// [`Gateway::send_verification_sms`].
    VerificationSms(&'a Otp),
    /// [`Gateway::send_verification_callout`].
    VerificationCallout(&'a Otp),
    /// [`Gateway::verify_code`].
    VerifyCode(&'a Otp),
}

impl Request<'_> {
    /// The operation this request performs.
    pub fn operation(&self) -> Operation {
        match self {
            Self::OtpSms(_) => Operation::OtpSms,
            Self::OtpCallout(_) => Operation::OtpCallout,
            Self::SmsMessage(_) => Operation::SmsMessage,
            Self::VerificationSms(_) => Operation::VerificationSms,
            Self::VerificationCallout(_) => Operation::VerificationCallout,
            Self::VerifyCode(_) => Operation::VerifyCode,
        }
    }
}

/// Send `request` through `gateway`.
///
/// # Errors
///
/// Returns the gateway's [`GatewayError`] unchanged.
pub async fn invoke(gateway: &dyn Gateway, request: Request<'_>) -> Result<String, GatewayError> {
    match request {
        Request::OtpSms(otp) => gateway.send_otp_sms(otp).await,
        Request::OtpCallout(otp) => gateway.send_otp_callout(otp).await,
        Request::SmsMessage(message) => gateway.send_sms_message(message).await,
        Request::VerificationSms(otp) => gateway.send_verification_sms(otp).await,
        Request::VerificationCallout(otp) => gateway.send_verification_callout(otp).await,
        Request::VerifyCode(otp) => gateway.verify_code(otp).await,
    }
}
