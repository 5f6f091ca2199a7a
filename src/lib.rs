//! Courier: API call audit logging and SMS/voice delivery glue.
//!
//! Two pieces sit on top of a pluggable [`store::Persist`] backend:
//! - [`audit::ApiLogger`] records the `new → completed|failed` lifecycle of
//!   an outbound API call.
//! - [`sms::sender::Sender`] delivers OTPs, callouts and plain messages
//!   through a primary gateway, falls back to a secondary one once, and
//!   writes exactly one [`sms::tracker::DeliveryTracker`] per attempt.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod logging;
pub mod store;

pub mod audit;
pub mod sms;
