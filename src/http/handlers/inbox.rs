use crate::domain::payment::PaymentStatus;
use crate::inbox::service::PurchaseWebhook;
use crate::service::orchestrator::err;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

pub async fn purchase_paid(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    ingest(state, headers, body, PaymentStatus::Executed).await
}

pub async fn purchase_failed(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    ingest(state, headers, body, PaymentStatus::Failed).await
}

/// The signature covers the exact raw body bytes; verification happens
/// before the body is parsed, and a failed check leaves it untouched.
async fn ingest(
    state: AppState,
    headers: HeaderMap,
    body: Bytes,
    status: PaymentStatus,
) -> axum::response::Response {
    let Some(signature) = headers.get("x-signature").and_then(|h| h.to_str().ok()) else {
        return StatusCode::FORBIDDEN.into_response();
    };
    if !state.verifier.verify(&body, signature) {
        return StatusCode::FORBIDDEN.into_response();
    }

    let webhook: PurchaseWebhook = match serde_json::from_slice(&body) {
        Ok(webhook) => webhook,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(err("INVALID_BODY", &e.to_string())),
            )
                .into_response()
        }
    };

    let result = match status {
        PaymentStatus::Executed => state.inbox.purchase_paid(webhook).await,
        _ => state.inbox.purchase_failed(webhook).await,
    };

    match result {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(err("INTERNAL_ERROR", &e.to_string())),
        )
            .into_response(),
    }
}
