//! Primary/secondary fallback dispatcher.
//!
//! Every operation runs the same sequence:
//!
//! 1. Resolve the primary gateway; unknown name → [`DispatchError::PrimaryUnsupported`].
//! 2. Render the OTP template (OTP operations only).
//! 3. Start a [`DeliveryTracker`] stamped from the clock.
//! 4. Call the primary. On failure record its error and fall back.
//! 5. Resolve the secondary; unknown name → [`DispatchError::SecondaryUnsupported`],
//!    the tracker is dropped unpersisted. Otherwise call it once and record
//!    any error.
//! 6. Store the status of the last gateway called and persist the tracker.
//!
//! No retries beyond the single fallback. Gateway latency and timeouts are
//! the gateway's business.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::clock::Clock;
use crate::store::Persist;

use super::gateway::{invoke, Gateway, OtpOperation, Request};
use super::registry::GatewayRegistry;
use super::tracker::{record as record_delivery, DeliveryTracker};
use super::{DispatchError, Message, Otp, ProviderPair};

/// Delivery surface consumed by host code.
///
/// Implemented by [`Sender`]; hosts can mock it in their own tests.
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Render and send an OTP by SMS.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on an unregistered gateway or a failed tracker write.
    async fn send_otp_sms(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        otp: &mut Otp,
    ) -> Result<(), DispatchError>;

    /// Render and read out an OTP in a voice callout.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on an unregistered gateway or a failed tracker write.
    async fn send_otp_callout(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        otp: &mut Otp,
    ) -> Result<(), DispatchError>;

    /// Send a plain SMS.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on an unregistered gateway or a failed tracker write.
    async fn send_message(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        message: &Message,
    ) -> Result<(), DispatchError>;

    /// Start a provider-managed verification by SMS.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on an unregistered gateway or a failed tracker write.
    async fn send_verification_sms(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        otp: &mut Otp,
    ) -> Result<(), DispatchError>;

    /// Start a provider-managed verification by voice callout.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on an unregistered gateway or a failed tracker write.
    async fn send_verification_callout(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        otp: &mut Otp,
    ) -> Result<(), DispatchError>;

    /// Check a code against a provider-managed verification.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on an unregistered gateway or a failed tracker write.
    async fn verify_code(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        otp: &mut Otp,
    ) -> Result<(), DispatchError>;
}

/// Dispatcher over a fixed [`GatewayRegistry`].
#[derive(Clone)]
pub struct Sender {
    clock: Arc<dyn Clock>,
    gateways: Arc<GatewayRegistry>,
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("gateways", &self.gateways)
            .finish()
    }
}

impl Sender {
    /// Create a sender over `gateways`, stamping trackers with `clock`.
    pub fn new(clock: Arc<dyn Clock>, gateways: Arc<GatewayRegistry>) -> Self {
        Self { clock, gateways }
    }

    /// The registry this sender resolves gateways from.
    pub fn gateways(&self) -> &GatewayRegistry {
        &self.gateways
    }

    /// Run an OTP-based `operation`.
    ///
    /// # Errors
    ///
    /// See [`DispatchError`].
    pub async fn dispatch_otp(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        operation: OtpOperation,
        otp: &mut Otp,
    ) -> Result<(), DispatchError> {
        let primary = self.resolve_primary(&otp.provider)?;
        otp.render();

        let otp: &Otp = otp;
        self.deliver(
            store,
            primary,
            &otp.number,
            &otp.text,
            &otp.provider,
            operation.request(otp),
        )
        .await
    }

    fn resolve_primary(&self, provider: &ProviderPair) -> Result<Arc<dyn Gateway>, DispatchError> {
        self.gateways.get(&provider.primary).ok_or_else(|| {
            error!(provider = %provider.primary, "primary provider not supported");
            DispatchError::PrimaryUnsupported {
                provider: provider.primary.clone(),
            }
        })
    }

    #[instrument(skip_all, fields(op = request.operation().as_str(), primary = %provider.primary))]
    async fn deliver(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        primary: Arc<dyn Gateway>,
        recipient: &str,
        text: &str,
        provider: &ProviderPair,
        request: Request<'_>,
    ) -> Result<(), DispatchError> {
        let mut tracker = DeliveryTracker::new(
            recipient,
            request.operation().tracker_kind(),
            text,
            provider.primary.as_str(),
            self.clock.now(),
        );

        let status = match invoke(primary.as_ref(), request).await {
            Ok(status) => status,
            Err(primary_err) => {
                warn!(error = %primary_err, "primary gateway failed");
                tracker.primary_gateway_error = Some(primary_err.message);

                let Some(secondary) = self.gateways.get(&provider.secondary) else {
                    error!(provider = %provider.secondary, "secondary provider not supported");
                    return Err(DispatchError::SecondaryUnsupported {
                        provider: provider.secondary.clone(),
                    });
                };

                info!(secondary = %provider.secondary, "falling back to secondary gateway");
                tracker.secondary_gateway = Some(provider.secondary.clone());

                match invoke(secondary.as_ref(), request).await {
                    Ok(status) => status,
                    Err(secondary_err) => {
                        warn!(error = %secondary_err, "secondary gateway failed");
                        tracker.secondary_gateway_error = Some(secondary_err.message);
                        secondary_err.status
                    }
                }
            }
        };

        tracker.status = status;
        record_delivery(store, &mut tracker).await?;
        Ok(())
    }
}

#[async_trait]
impl SmsSender for Sender {
    async fn send_otp_sms(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        otp: &mut Otp,
    ) -> Result<(), DispatchError> {
        self.dispatch_otp(store, OtpOperation::OtpSms, otp).await
    }

    async fn send_otp_callout(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        otp: &mut Otp,
    ) -> Result<(), DispatchError> {
        self.dispatch_otp(store, OtpOperation::OtpCallout, otp).await
    }

    async fn send_message(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        message: &Message,
    ) -> Result<(), DispatchError> {
        let primary = self.resolve_primary(&message.provider)?;
        self.deliver(
            store,
            primary,
            &message.number,
            &message.text,
            &message.provider,
            Request::SmsMessage(message),
        )
        .await
    }

    async fn send_verification_sms(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        otp: &mut Otp,
    ) -> Result<(), DispatchError> {
        self.dispatch_otp(store, OtpOperation::VerificationSms, otp)
            .await
    }

    async fn send_verification_callout(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        otp: &mut Otp,
    ) -> Result<(), DispatchError> {
        self.dispatch_otp(store, OtpOperation::VerificationCallout, otp)
            .await
    }

    async fn verify_code(
        &self,
        store: &dyn Persist<DeliveryTracker>,
        otp: &mut Otp,
    ) -> Result<(), DispatchError> {
        self.dispatch_otp(store, OtpOperation::VerifyCode, otp).await
    }
}
