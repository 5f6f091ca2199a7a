//! Tests for `src/sms/sender.rs`: primary/secondary fallback and tracking.

use async_trait::async_trait;

use courier::sms::gateway::{GatewayError, Operation, OtpOperation};
use courier::sms::sender::SmsSender;
use courier::sms::tracker::{DeliveryTracker, TrackerKind};
use courier::sms::{DispatchError, Message, Otp, ProviderPair};
use courier::store::memory::MemoryStore;
use courier::store::sqlite::SqliteStore;
use courier::store::{Persist, StoreError};

use crate::support::{sender_with, sent_at, ScriptedGateway};

fn otp(primary: &str, secondary: &str) -> Otp {
    Otp::new(
        "+15550100",
        "Your code is %s",
        "1234",
        ProviderPair::new(primary, secondary),
    )
}

fn only_tracker(store: &MemoryStore) -> DeliveryTracker {
    let mut trackers = store.trackers().expect("snapshot");
    assert_eq!(trackers.len(), 1, "exactly one tracker per dispatch");
    trackers.remove(0)
}

#[tokio::test]
async fn unknown_primary_is_a_configuration_error_and_writes_nothing() {
    let sender = sender_with(vec![("sinch", ScriptedGateway::ok("sent"))]);
    let store = MemoryStore::new();
    let mut otp = otp("twilio", "sinch");

    let err = sender
        .send_otp_sms(&store, &mut otp)
        .await
        .expect_err("twilio is not registered");

    assert!(matches!(err, DispatchError::PrimaryUnsupported { ref provider } if provider == "twilio"));
    assert_eq!(err.to_string(), "primary provider not supported: twilio");
    assert!(store.trackers().expect("snapshot").is_empty());
    assert!(otp.text.is_empty(), "template is not rendered before lookup");
}

#[tokio::test]
async fn primary_success_records_its_status_without_secondary() {
    let primary = ScriptedGateway::ok("delivered");
    let secondary = ScriptedGateway::ok("sent");
    let sender = sender_with(vec![("twilio", primary.clone()), ("sinch", secondary.clone())]);
    let store = MemoryStore::new();
    let mut otp = otp("twilio", "sinch");

    sender
        .send_otp_sms(&store, &mut otp)
        .await
        .expect("dispatch should succeed");

    let tracker = only_tracker(&store);
    assert_eq!(tracker.status, "delivered");
    assert_eq!(tracker.primary_gateway, "twilio");
    assert!(tracker.primary_gateway_error.is_none());
    assert!(tracker.secondary_gateway.is_none());
    assert!(tracker.secondary_gateway_error.is_none());
    assert_eq!(tracker.recipient, "+15550100");
    assert_eq!(tracker.kind, TrackerKind::Sms);
    assert_eq!(tracker.sent_at, sent_at());
    assert!(tracker.id.is_some());

    assert_eq!(primary.calls().len(), 1);
    assert!(secondary.calls().is_empty());
}

#[tokio::test]
async fn primary_failure_without_registered_secondary_discards_tracker() {
    let sender = sender_with(vec![(
        "twilio",
        ScriptedGateway::failing(GatewayError::new("timeout")),
    )]);
    let store = MemoryStore::new();
    let mut otp = otp("twilio", "sinch");

    let err = sender
        .send_otp_sms(&store, &mut otp)
        .await
        .expect_err("sinch is not registered");

    assert!(matches!(err, DispatchError::SecondaryUnsupported { ref provider } if provider == "sinch"));
    assert_eq!(err.to_string(), "secondary provider not supported: sinch");
    assert!(store.trackers().expect("snapshot").is_empty());
}

#[tokio::test]
async fn fallback_scenario_records_primary_error_and_secondary_status() {
    let primary = ScriptedGateway::failing(GatewayError::new("timeout"));
    let secondary = ScriptedGateway::ok("sent");
    let sender = sender_with(vec![("twilio", primary.clone()), ("sinch", secondary.clone())]);
    let store = MemoryStore::new();
    let mut otp = otp("twilio", "sinch");

    sender
        .send_otp_sms(&store, &mut otp)
        .await
        .expect("delivery failures are not returned");

    let tracker = only_tracker(&store);
    assert_eq!(tracker.primary_gateway_error.as_deref(), Some("timeout"));
    assert_eq!(tracker.secondary_gateway.as_deref(), Some("sinch"));
    assert!(tracker.secondary_gateway_error.is_none());
    assert_eq!(tracker.status, "sent");
    assert_eq!(tracker.text, "Your code is 1234");
    assert!(tracker.used_fallback());
    assert!(tracker.delivered());

    // Both gateways saw the rendered text.
    assert_eq!(primary.calls()[0].text, "Your code is 1234");
    assert_eq!(secondary.calls()[0].text, "Your code is 1234");
    assert_eq!(otp.text, "Your code is 1234");
}

#[tokio::test]
async fn both_gateways_failing_is_recorded_not_returned() {
    let sender = sender_with(vec![
        ("twilio", ScriptedGateway::failing(GatewayError::new("timeout"))),
        (
            "sinch",
            ScriptedGateway::failing(GatewayError::new("number blocked").with_status("rejected")),
        ),
    ]);
    let store = MemoryStore::new();
    let mut otp = otp("twilio", "sinch");

    sender
        .send_otp_callout(&store, &mut otp)
        .await
        .expect("delivery failures are not returned");

    let tracker = only_tracker(&store);
    assert_eq!(tracker.kind, TrackerKind::Callout);
    assert_eq!(tracker.primary_gateway_error.as_deref(), Some("timeout"));
    assert_eq!(tracker.secondary_gateway_error.as_deref(), Some("number blocked"));
    assert_eq!(tracker.status, "rejected");
    assert!(!tracker.delivered());
}

#[tokio::test]
async fn each_operation_calls_its_gateway_method_and_kind() {
    let gateway = ScriptedGateway::ok("ok");
    let sender = sender_with(vec![("twilio", gateway.clone())]);
    let store = MemoryStore::new();

    sender.send_otp_sms(&store, &mut otp("twilio", "")).await.expect("otp sms");
    sender.send_otp_callout(&store, &mut otp("twilio", "")).await.expect("otp callout");
    sender
        .send_message(
            &store,
            &Message::new("+15550199", "Your order shipped", ProviderPair::new("twilio", "")),
        )
        .await
        .expect("message");
    sender
        .send_verification_sms(&store, &mut otp("twilio", ""))
        .await
        .expect("verification sms");
    sender
        .send_verification_callout(&store, &mut otp("twilio", ""))
        .await
        .expect("verification callout");
    sender.verify_code(&store, &mut otp("twilio", "")).await.expect("verify");

    let methods: Vec<&str> = gateway.calls().iter().map(|c| c.method).collect();
    assert_eq!(
        methods,
        vec![
            "send_otp_sms",
            "send_otp_callout",
            "send_sms_message",
            "send_verification_sms",
            "send_verification_callout",
            "verify_code",
        ]
    );

    let kinds: Vec<TrackerKind> = store
        .trackers()
        .expect("snapshot")
        .iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TrackerKind::Sms,
            TrackerKind::Callout,
            TrackerKind::Sms,
            TrackerKind::Sms,
            TrackerKind::Callout,
            TrackerKind::Sms,
        ]
    );
}

#[tokio::test]
async fn plain_message_is_sent_verbatim() {
    let gateway = ScriptedGateway::ok("queued");
    let sender = sender_with(vec![("twilio", gateway.clone())]);
    let store = MemoryStore::new();
    let message = Message::new("+15550199", "100% off today", ProviderPair::new("twilio", "sinch"));

    sender.send_message(&store, &message).await.expect("message");

    let tracker = only_tracker(&store);
    assert_eq!(tracker.text, "100% off today");
    assert_eq!(tracker.recipient, "+15550199");
    let calls = gateway.calls();
    assert_eq!(calls[0].number, "+15550199");
    assert_eq!(calls[0].text, "100% off today");
}

#[tokio::test]
async fn plain_message_falls_back_to_secondary() {
    let primary = ScriptedGateway::failing(GatewayError::new("carrier down"));
    let secondary = ScriptedGateway::ok("queued");
    let sender = sender_with(vec![("twilio", primary.clone()), ("sinch", secondary.clone())]);
    let store = MemoryStore::new();
    let message = Message::new("+15550199", "Your order shipped", ProviderPair::new("twilio", "sinch"));

    sender
        .send_message(&store, &message)
        .await
        .expect("delivery failures are not returned");

    let tracker = only_tracker(&store);
    assert_eq!(tracker.kind, TrackerKind::Sms);
    assert_eq!(tracker.text, "Your order shipped");
    assert_eq!(tracker.primary_gateway_error.as_deref(), Some("carrier down"));
    assert_eq!(tracker.secondary_gateway.as_deref(), Some("sinch"));
    assert!(tracker.secondary_gateway_error.is_none());
    assert_eq!(tracker.status, "queued");

    assert_eq!(primary.calls()[0].method, "send_sms_message");
    assert_eq!(secondary.calls()[0].method, "send_sms_message");
    assert_eq!(secondary.calls()[0].text, "Your order shipped");
}

#[tokio::test]
async fn plain_message_without_registered_secondary_discards_tracker() {
    let sender = sender_with(vec![(
        "twilio",
        ScriptedGateway::failing(GatewayError::new("carrier down")),
    )]);
    let store = MemoryStore::new();
    let message = Message::new("+15550199", "Your order shipped", ProviderPair::new("twilio", "sinch"));

    let err = sender
        .send_message(&store, &message)
        .await
        .expect_err("sinch is not registered");

    assert!(matches!(err, DispatchError::SecondaryUnsupported { ref provider } if provider == "sinch"));
    assert!(store.trackers().expect("snapshot").is_empty());
}

#[tokio::test]
async fn dispatch_otp_only_reaches_otp_gateway_methods() {
    let gateway = ScriptedGateway::ok("sent");
    let sender = sender_with(vec![("twilio", gateway.clone())]);
    let store = MemoryStore::new();

    for op in OtpOperation::ALL {
        sender
            .dispatch_otp(&store, op, &mut otp("twilio", "sinch"))
            .await
            .expect("dispatch");
    }

    let trackers = store.trackers().expect("snapshot");
    assert_eq!(trackers.len(), OtpOperation::ALL.len());
    for tracker in &trackers {
        assert!(tracker.primary_gateway_error.is_none());
        assert!(tracker.secondary_gateway.is_none());
        assert_eq!(tracker.status, "sent");
    }
    for (tracker, op) in trackers.iter().zip(OtpOperation::ALL) {
        assert_eq!(tracker.kind, Operation::from(op).tracker_kind());
    }
    assert!(gateway
        .calls()
        .iter()
        .all(|call| call.method != "send_sms_message"));
}

#[tokio::test]
async fn verify_code_keeps_raw_code_for_gateway() {
    let gateway = ScriptedGateway::ok("approved");
    let sender = sender_with(vec![("twilio", gateway.clone())]);
    let store = MemoryStore::new();
    let mut otp = otp("twilio", "sinch");

    sender.verify_code(&store, &mut otp).await.expect("verify");

    assert_eq!(gateway.calls()[0].text, "1234");
    assert_eq!(only_tracker(&store).status, "approved");
}

#[tokio::test]
async fn dispatch_persists_through_sqlite() {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("pool should connect");
    let store = SqliteStore::from_pool(pool);
    store.migrate().await.expect("schema should apply");

    let sender = sender_with(vec![
        ("twilio", ScriptedGateway::failing(GatewayError::new("timeout"))),
        ("sinch", ScriptedGateway::ok("sent")),
    ]);
    let mut otp = otp("twilio", "sinch");
    sender.send_otp_sms(&store, &mut otp).await.expect("dispatch");

    let trackers = store.trackers_for("+15550100").await.expect("query");
    assert_eq!(trackers.len(), 1);
    assert_eq!(trackers[0].primary_gateway_error.as_deref(), Some("timeout"));
    assert_eq!(trackers[0].secondary_gateway.as_deref(), Some("sinch"));
    assert_eq!(trackers[0].status, "sent");
    assert_eq!(trackers[0].sent_at, sent_at());
}

struct BrokenStore;

#[async_trait]
impl Persist<DeliveryTracker> for BrokenStore {
    async fn persist(&self, _tracker: &mut DeliveryTracker) -> Result<(), StoreError> {
        Err(StoreError::Lock("disk on fire".to_owned()))
    }
}

#[tokio::test]
async fn failed_tracker_write_is_surfaced() {
    let sender = sender_with(vec![("twilio", ScriptedGateway::ok("sent"))]);
    let mut otp = otp("twilio", "sinch");

    let err = sender
        .send_otp_sms(&BrokenStore, &mut otp)
        .await
        .expect_err("write failure should surface");

    assert!(matches!(err, DispatchError::Store(StoreError::Lock(_))));
}

/// Host-owned tracker row with an extra column.
#[derive(Debug, Clone)]
struct TenantDelivery {
    tenant: &'static str,
    recipient: String,
    fallback: bool,
    status: String,
}

struct TenantTrackerStore {
    rows: std::sync::Mutex<Vec<TenantDelivery>>,
}

#[async_trait]
impl Persist<DeliveryTracker> for TenantTrackerStore {
    async fn persist(&self, tracker: &mut DeliveryTracker) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("rows lock");
        rows.push(TenantDelivery {
            tenant: "acme",
            recipient: tracker.recipient.clone(),
            fallback: tracker.used_fallback(),
            status: tracker.status.clone(),
        });
        tracker.id = Some(i64::try_from(rows.len()).expect("small"));
        Ok(())
    }
}

#[tokio::test]
async fn host_store_maps_trackers_into_its_own_rows() {
    let sender = sender_with(vec![
        ("twilio", ScriptedGateway::failing(GatewayError::new("timeout"))),
        ("sinch", ScriptedGateway::ok("sent")),
    ]);
    let store = TenantTrackerStore {
        rows: std::sync::Mutex::new(Vec::new()),
    };

    sender
        .send_otp_sms(&store, &mut otp("twilio", "sinch"))
        .await
        .expect("dispatch");

    let rows = store.rows.lock().expect("rows lock").clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tenant, "acme");
    assert_eq!(rows[0].recipient, "+15550100");
    assert!(rows[0].fallback);
    assert_eq!(rows[0].status, "sent");
}
