use chrono::{Duration, Utc};
use payment_orchestrator::bus::{Delivery, InMemoryBus, PaymentEvent};
use payment_orchestrator::correlation::store::{CorrelationStore, InMemoryCorrelationStore};
use payment_orchestrator::domain::payment::{
    Currency, InitiatePaymentRequest, PaymentStatus, ThreeDSecureCallback,
};
use payment_orchestrator::gateways::mock::MockGatewayClient;
use payment_orchestrator::service::orchestrator::{CallbackError, PaymentOrchestrator};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

fn setup(
    behavior: &str,
) -> (
    PaymentOrchestrator,
    Arc<InMemoryCorrelationStore>,
    UnboundedReceiver<Delivery>,
) {
    let (bus, rx) = InMemoryBus::channel();
    let correlations = Arc::new(InMemoryCorrelationStore::new());
    let orchestrator = PaymentOrchestrator {
        gateway: Arc::new(MockGatewayClient::new(behavior)),
        bus: Arc::new(bus),
        correlations: correlations.clone(),
        self_url: "http://localhost:3000".to_string(),
        ui_url: "http://localhost:4200".to_string(),
        challenge_ttl: Duration::hours(3),
    };
    (orchestrator, correlations, rx)
}

fn valid_request() -> InitiatePaymentRequest {
    InitiatePaymentRequest {
        amount: 100.0,
        currency: Currency::EUR,
        cardholder_name: "John Doe".to_string(),
        card_number: "4444333322221111".to_string(),
        expires: "12/25".to_string(),
        cvc: "123".to_string(),
    }
}

#[tokio::test]
async fn initiate_returns_purchase_id_and_queues_the_charge() {
    let (orchestrator, _store, mut rx) = setup("ALWAYS_EXECUTED");

    let resp = orchestrator.initiate("10.0.0.1", valid_request()).await.unwrap();
    assert!(!resp.purchase_id.is_empty());

    let delivery = rx.try_recv().unwrap();
    let PaymentEvent::ProcessPayment(data) = delivery.event else {
        panic!("expected a process-payment event");
    };
    assert_eq!(data.purchase_id, resp.purchase_id);
    assert_eq!(data.card_number, "4444333322221111");
    assert_eq!(data.remote_ip, "10.0.0.1");
    // Nothing else: the charge itself has not been attempted yet.
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn executed_charge_publishes_exactly_one_terminal_status() {
    let (orchestrator, _store, mut rx) = setup("ALWAYS_EXECUTED");

    let resp = orchestrator.initiate("10.0.0.1", valid_request()).await.unwrap();
    let PaymentEvent::ProcessPayment(data) = rx.try_recv().unwrap().event else {
        panic!("expected a process-payment event");
    };

    orchestrator.process(data).await.unwrap();

    let PaymentEvent::UpdatePaymentStatus(event) = rx.try_recv().unwrap().event else {
        panic!("expected a status event");
    };
    assert_eq!(event.purchase_id, resp.purchase_id);
    assert_eq!(event.status, PaymentStatus::Executed);
    assert!(event.three_d_secure_request.is_none());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn business_error_maps_to_failed_without_retry() {
    let (orchestrator, _store, mut rx) = setup("ALWAYS_ERROR");

    let resp = orchestrator.initiate("10.0.0.1", valid_request()).await.unwrap();
    let PaymentEvent::ProcessPayment(data) = rx.try_recv().unwrap().event else {
        panic!("expected a process-payment event");
    };

    // A structured decline is data, not an error: process succeeds.
    orchestrator.process(data).await.unwrap();

    let PaymentEvent::UpdatePaymentStatus(event) = rx.try_recv().unwrap().event else {
        panic!("expected a status event");
    };
    assert_eq!(event.purchase_id, resp.purchase_id);
    assert_eq!(event.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn transport_error_publishes_failed_and_reraises() {
    let (orchestrator, _store, mut rx) = setup("TRANSPORT_ERROR");

    orchestrator.initiate("10.0.0.1", valid_request()).await.unwrap();
    let PaymentEvent::ProcessPayment(data) = rx.try_recv().unwrap().event else {
        panic!("expected a process-payment event");
    };

    // The error propagates so the bus can redeliver, but the subscriber is
    // told about the failure first.
    assert!(orchestrator.process(data).await.is_err());

    let PaymentEvent::UpdatePaymentStatus(event) = rx.try_recv().unwrap().event else {
        panic!("expected a status event");
    };
    assert_eq!(event.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn pending_charge_emits_nothing() {
    let (orchestrator, _store, mut rx) = setup("ALWAYS_PENDING");

    orchestrator.initiate("10.0.0.1", valid_request()).await.unwrap();
    let PaymentEvent::ProcessPayment(data) = rx.try_recv().unwrap().event else {
        panic!("expected a process-payment event");
    };

    orchestrator.process(data).await.unwrap();
    // Await the webhook; no emission, no polling.
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn three_d_secure_charge_stores_correlation_and_describes_challenge() {
    let (orchestrator, store, mut rx) = setup("THREE_D_SECURE_POST");

    let resp = orchestrator.initiate("10.0.0.1", valid_request()).await.unwrap();
    let PaymentEvent::ProcessPayment(data) = rx.try_recv().unwrap().event else {
        panic!("expected a process-payment event");
    };

    orchestrator.process(data).await.unwrap();

    let record = store.get(&resp.purchase_id).await.unwrap().unwrap();
    assert_eq!(record.callback_url, "https://gate.mock/cb");

    let PaymentEvent::UpdatePaymentStatus(event) = rx.try_recv().unwrap().event else {
        panic!("expected a status event");
    };
    assert_eq!(event.status, PaymentStatus::ThreeDSecureRequired);

    let request = event.three_d_secure_request.unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "https://bank.mock/challenge");
    let body = request.body.unwrap();
    assert_eq!(body.md, "mock-md");
    assert_eq!(body.pa_req, "mock-pa-req");
    assert_eq!(
        body.term_url,
        format!("http://localhost:3000/payments/{}/callback", resp.purchase_id)
    );
}

#[tokio::test]
async fn callback_consumes_correlation_exactly_once() {
    let (orchestrator, store, mut rx) = setup("THREE_D_SECURE_POST");

    let resp = orchestrator.initiate("10.0.0.1", valid_request()).await.unwrap();
    let PaymentEvent::ProcessPayment(data) = rx.try_recv().unwrap().event else {
        panic!("expected a process-payment event");
    };
    orchestrator.process(data).await.unwrap();
    let _ = rx.try_recv(); // 3DS-required status

    let callback = ThreeDSecureCallback {
        md: Some("mock-md".to_string()),
        pa_res: "pa-res".to_string(),
    };
    orchestrator
        .complete_three_d_secure(&resp.purchase_id, callback.clone())
        .await
        .unwrap();

    assert!(store.get(&resp.purchase_id).await.unwrap().is_none());
    let PaymentEvent::UpdatePaymentStatus(event) = rx.try_recv().unwrap().event else {
        panic!("expected a status event");
    };
    assert_eq!(event.status, PaymentStatus::Executed);

    // The record was consumed; a replayed callback finds nothing.
    let second = orchestrator
        .complete_three_d_secure(&resp.purchase_id, callback)
        .await;
    assert!(matches!(second, Err(CallbackError::NotFound(_))));
}

#[tokio::test]
async fn callback_for_unknown_purchase_is_not_found() {
    let (orchestrator, _store, _rx) = setup("ALWAYS_EXECUTED");

    let result = orchestrator
        .complete_three_d_secure(
            "missing",
            ThreeDSecureCallback {
                md: None,
                pa_res: "pa-res".to_string(),
            },
        )
        .await;
    assert!(matches!(result, Err(CallbackError::NotFound(_))));
}

#[tokio::test]
async fn expired_correlation_rejects_completion_but_is_not_deleted() {
    let (orchestrator, store, _rx) = setup("ALWAYS_EXECUTED");
    let ttl = Duration::hours(3);

    store
        .put("p-old", "https://gw/cb", Utc::now() - ttl - Duration::seconds(5))
        .await
        .unwrap();

    let result = orchestrator
        .complete_three_d_secure(
            "p-old",
            ThreeDSecureCallback {
                md: None,
                pa_res: "pa-res".to_string(),
            },
        )
        .await;
    assert!(matches!(result, Err(CallbackError::Expired(_))));

    // Cleanup belongs to the sweep, not to a failed completion attempt.
    assert!(store.get("p-old").await.unwrap().is_some());
}

#[tokio::test]
async fn correlation_just_inside_ttl_still_completes() {
    let (orchestrator, store, mut rx) = setup("ALWAYS_EXECUTED");
    let ttl = Duration::hours(3);

    store
        .put("p-fresh", "https://gw/cb", Utc::now() - ttl + Duration::seconds(30))
        .await
        .unwrap();

    orchestrator
        .complete_three_d_secure(
            "p-fresh",
            ThreeDSecureCallback {
                md: Some("m".to_string()),
                pa_res: "pa-res".to_string(),
            },
        )
        .await
        .unwrap();

    assert!(store.get("p-fresh").await.unwrap().is_none());
    let PaymentEvent::UpdatePaymentStatus(event) = rx.try_recv().unwrap().event else {
        panic!("expected a status event");
    };
    assert_eq!(event.status, PaymentStatus::Executed);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_the_gateway() {
    let (orchestrator, _store, mut rx) = setup("ALWAYS_EXECUTED");

    let cases = vec![
        InitiatePaymentRequest {
            amount: 0.0,
            ..valid_request()
        },
        InitiatePaymentRequest {
            card_number: "not-a-card".to_string(),
            ..valid_request()
        },
        InitiatePaymentRequest {
            expires: "13-25".to_string(),
            ..valid_request()
        },
        InitiatePaymentRequest {
            cvc: "12".to_string(),
            ..valid_request()
        },
        InitiatePaymentRequest {
            cardholder_name: String::new(),
            ..valid_request()
        },
    ];

    for case in cases {
        let result = orchestrator.initiate("10.0.0.1", case).await;
        let (status, _) = result.err().expect("validation should fail");
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    }

    // Nothing reached the bus.
    assert!(rx.try_recv().is_err());
}
