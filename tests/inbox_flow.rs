use payment_orchestrator::bus::{InMemoryBus, PaymentEvent};
use payment_orchestrator::domain::payment::PaymentStatus;
use payment_orchestrator::inbox::service::{InboxService, PurchaseWebhook};
use payment_orchestrator::service::status_broadcaster::StatusBroadcaster;
use std::sync::Arc;

fn webhook(id: &str) -> PurchaseWebhook {
    PurchaseWebhook {
        id: id.to_string(),
        direct_charge_url: "https://gate.test/p/123/".to_string(),
    }
}

#[tokio::test]
async fn purchase_paid_publishes_terminal_executed() {
    let (bus, mut rx) = InMemoryBus::channel();
    let inbox = InboxService { bus: Arc::new(bus) };

    inbox.purchase_paid(webhook("123")).await.unwrap();

    let PaymentEvent::UpdatePaymentStatus(event) = rx.try_recv().unwrap().event else {
        panic!("expected a status event");
    };
    assert_eq!(event.purchase_id, "123");
    assert_eq!(event.status, PaymentStatus::Executed);
    assert!(event.three_d_secure_request.is_none());
}

#[tokio::test]
async fn purchase_failed_publishes_terminal_failed() {
    let (bus, mut rx) = InMemoryBus::channel();
    let inbox = InboxService { bus: Arc::new(bus) };

    inbox.purchase_failed(webhook("456")).await.unwrap();

    let PaymentEvent::UpdatePaymentStatus(event) = rx.try_recv().unwrap().event else {
        panic!("expected a status event");
    };
    assert_eq!(event.purchase_id, "456");
    assert_eq!(event.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn webhook_status_reaches_a_live_subscriber() {
    let (bus, mut rx) = InMemoryBus::channel();
    let inbox = InboxService { bus: Arc::new(bus) };
    let broadcaster = StatusBroadcaster::new();

    let mut stream = broadcaster.subscribe("123").await;

    // Webhook path, independent of any S2S outcome for the same purchase.
    inbox.purchase_paid(webhook("123")).await.unwrap();
    let PaymentEvent::UpdatePaymentStatus(event) = rx.try_recv().unwrap().event else {
        panic!("expected a status event");
    };
    broadcaster.emit(event).await;

    let received = stream.recv().await.unwrap();
    assert_eq!(received.purchase_id, "123");
    assert_eq!(received.status, PaymentStatus::Executed);
}

#[tokio::test]
async fn webhook_body_parses_gateway_wire_format() {
    let webhook: PurchaseWebhook =
        serde_json::from_str(r#"{"id":"123","direct_post_url":"https://gw/p/123/"}"#).unwrap();
    assert_eq!(webhook.id, "123");
    assert_eq!(webhook.direct_charge_url, "https://gw/p/123/");
}

#[test]
fn webhook_body_without_charge_url_is_rejected() {
    // Both fields are mandatory; a body missing one is a schema error.
    assert!(serde_json::from_str::<PurchaseWebhook>(r#"{"id":"123"}"#).is_err());
    assert!(
        serde_json::from_str::<PurchaseWebhook>(r#"{"direct_post_url":"https://gw/p/1/"}"#)
            .is_err()
    );
}
