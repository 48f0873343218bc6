use crate::domain::payment::{InitiatePaymentRequest, ThreeDSecureCallback};
use crate::service::orchestrator::{err, CallbackError};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

pub async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    // Parsed by hand so malformed bodies come back as 400, not 422.
    let req: InitiatePaymentRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(err("INVALID_BODY", &e.to_string())),
            )
                .into_response()
        }
    };

    let remote_ip = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();

    match state.orchestrator.initiate(&remote_ip, req).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

/// Live push stream of status transitions for one purchase. One message per
/// transition; the stream ends when the client disconnects.
pub async fn payment_events(
    State(state): State<AppState>,
    Path(purchase_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe(&purchase_id).await;

    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().data(data)))
        }
        // A lagged receiver skips the missed events rather than erroring.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn three_d_secure_callback(
    State(state): State<AppState>,
    Path(purchase_id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let callback: ThreeDSecureCallback = match serde_json::from_slice(&body) {
        Ok(callback) => callback,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(err("INVALID_BODY", &e.to_string())),
            )
                .into_response()
        }
    };

    match state
        .orchestrator
        .complete_three_d_secure(&purchase_id, callback)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(CallbackError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(err("CALLBACK_NOT_FOUND", "no pending 3-D Secure challenge")),
        )
            .into_response(),
        Err(CallbackError::Expired(_)) => (
            StatusCode::BAD_REQUEST,
            Json(err("CALLBACK_EXPIRED", "3-D Secure challenge expired")),
        )
            .into_response(),
        Err(CallbackError::Other(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(err("INTERNAL_ERROR", &e.to_string())),
        )
            .into_response(),
    }
}

pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
