use crate::bus::{MessageBus, PaymentEvent, ProcessPaymentData};
use crate::correlation::store::CorrelationStore;
use crate::domain::payment::{
    ErrorEnvelope, ErrorPayload, InitiatePaymentRequest, InitiatePaymentResponse, PaymentStatus,
    StatusEvent, ThreeDSecureBody, ThreeDSecureCallback, ThreeDSecureRequest,
};
use crate::gateways::{ChargeRequest, ChargeResult, GatewayClient, RegisterPurchaseRequest};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

const CLIENT_EMAIL: &str = "test@test.com";
const PRODUCT_NAME: &str = "Dynamic";

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("no pending 3-D Secure challenge for purchase {0}")]
    NotFound(String),
    #[error("3-D Secure challenge for purchase {0} has expired")]
    Expired(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Core control logic. Holds no per-purchase state beyond one event handling
/// call; the correlation store is the only durable state.
pub struct PaymentOrchestrator {
    pub gateway: Arc<dyn GatewayClient>,
    pub bus: Arc<dyn MessageBus>,
    pub correlations: Arc<dyn CorrelationStore>,
    pub self_url: String,
    pub ui_url: String,
    pub challenge_ttl: chrono::Duration,
}

impl PaymentOrchestrator {
    /// Registers the purchase upstream and hands the charge to the bus.
    /// Returns the purchase id immediately so the caller can subscribe to
    /// status events before the charge is attempted.
    pub async fn initiate(
        &self,
        remote_ip: &str,
        req: InitiatePaymentRequest,
    ) -> Result<InitiatePaymentResponse, (axum::http::StatusCode, ErrorEnvelope)> {
        validate_request(&req)?;

        let amount_minor = (req.amount * 100.0).round() as i64;
        let purchase = self
            .gateway
            .register_purchase(RegisterPurchaseRequest {
                client_email: CLIENT_EMAIL.to_string(),
                currency: req.currency.as_str().to_string(),
                product_name: PRODUCT_NAME.to_string(),
                price_minor: amount_minor,
                success_redirect: format!("{}/success", self.ui_url),
                failure_redirect: format!("{}/failure", self.ui_url),
            })
            .await
            .map_err(internal)?;

        tracing::info!("purchase created with id {}", purchase.id);

        self.bus
            .publish(PaymentEvent::ProcessPayment(ProcessPaymentData {
                purchase_id: purchase.id.clone(),
                direct_charge_url: purchase.direct_charge_url,
                cardholder_name: req.cardholder_name,
                card_number: req.card_number,
                expires: req.expires,
                cvc: req.cvc,
                remote_ip: remote_ip.to_string(),
            }))
            .await
            .map_err(internal)?;

        Ok(InitiatePaymentResponse {
            purchase_id: purchase.id,
        })
    }

    /// Bus consumer for `ProcessPayment`. Any failure, transport or
    /// downstream, surfaces a terminal `Failed` status before re-raising so
    /// the subscriber is never left silently pending while the bus retries.
    pub async fn process(&self, data: ProcessPaymentData) -> Result<()> {
        let charge = ChargeRequest {
            cardholder_name: data.cardholder_name,
            card_number: data.card_number,
            expires: data.expires,
            cvc: data.cvc,
            remote_ip: data.remote_ip,
        };

        let outcome = match self.gateway.charge(&data.direct_charge_url, &charge).await {
            Ok(result) => self.handle_status(&data.purchase_id, result).await,
            Err(err) => Err(err),
        };

        if let Err(err) = outcome {
            tracing::error!("failed to process payment {}: {err:#}", data.purchase_id);
            if let Err(publish_err) = self.publish_failed(&data.purchase_id).await {
                tracing::error!("failed to publish failure status: {publish_err:#}");
            }
            return Err(err);
        }

        Ok(())
    }

    /// One dispatch for both the S2S path and the challenge-completion path.
    pub async fn handle_status(&self, purchase_id: &str, result: ChargeResult) -> Result<()> {
        match result {
            ChargeResult::Executed => {
                tracing::info!("payment executed for purchase {purchase_id}");
                self.publish_status(purchase_id, PaymentStatus::Executed, None)
                    .await
            }
            ChargeResult::Error => self.publish_failed(purchase_id).await,
            ChargeResult::ThreeDSecureRequired {
                method,
                pa_req,
                md,
                url,
                callback_url,
            } => {
                tracing::info!("3-D Secure required for purchase {purchase_id}");
                // The correlation must exist before the challenge reaches the
                // browser, otherwise the return callback can miss it.
                self.correlations
                    .put(purchase_id, &callback_url, Utc::now())
                    .await?;

                let request =
                    self.build_challenge_request(purchase_id, &method, &url, md.as_deref(), &pa_req)?;
                self.publish_status(purchase_id, PaymentStatus::ThreeDSecureRequired, Some(request))
                    .await
            }
            // Await the asynchronous webhook; no polling, no timeout here.
            ChargeResult::Pending | ChargeResult::Authorized => Ok(()),
        }
    }

    pub fn build_challenge_request(
        &self,
        purchase_id: &str,
        method: &str,
        url: &str,
        md: Option<&str>,
        pa_req: &str,
    ) -> Result<ThreeDSecureRequest> {
        let term_url = format!("{}/payments/{purchase_id}/callback", self.self_url);
        let md = md.unwrap_or("");

        match method {
            "GET" => {
                let mut challenge_url =
                    Url::parse(url).map_err(|e| anyhow::anyhow!("invalid challenge URL: {e}"))?;
                challenge_url
                    .query_pairs_mut()
                    .append_pair("MD", md)
                    .append_pair("PaReq", pa_req)
                    .append_pair("TermUrl", &term_url);

                Ok(ThreeDSecureRequest {
                    method: "GET".to_string(),
                    url: challenge_url.to_string(),
                    body: None,
                })
            }
            "POST" => Ok(ThreeDSecureRequest {
                method: "POST".to_string(),
                url: url.to_string(),
                body: Some(ThreeDSecureBody {
                    md: md.to_string(),
                    pa_req: pa_req.to_string(),
                    term_url,
                }),
            }),
            other => anyhow::bail!("unsupported 3-D Secure challenge method: {other}"),
        }
    }

    /// Browser return path. The correlation is consumed exactly once: a
    /// second callback for the same purchase finds nothing. Expired records
    /// are left for the sweep.
    pub async fn complete_three_d_secure(
        &self,
        purchase_id: &str,
        callback: ThreeDSecureCallback,
    ) -> Result<(), CallbackError> {
        let correlation = self
            .correlations
            .get(purchase_id)
            .await?
            .ok_or_else(|| CallbackError::NotFound(purchase_id.to_string()))?;

        if correlation.created_at + self.challenge_ttl < Utc::now() {
            return Err(CallbackError::Expired(purchase_id.to_string()));
        }

        let result = self
            .gateway
            .complete_challenge(&correlation.callback_url, callback.md.as_deref(), &callback.pa_res)
            .await?;

        // A concurrent callback may have consumed the record while the
        // gateway call was in flight; only the caller that deletes it
        // publishes the outcome.
        if self.correlations.delete(purchase_id).await? {
            self.handle_status(purchase_id, result).await?;
        }
        Ok(())
    }

    async fn publish_failed(&self, purchase_id: &str) -> Result<()> {
        tracing::error!("payment failed for purchase {purchase_id}");
        self.publish_status(purchase_id, PaymentStatus::Failed, None).await
    }

    async fn publish_status(
        &self,
        purchase_id: &str,
        status: PaymentStatus,
        three_d_secure_request: Option<ThreeDSecureRequest>,
    ) -> Result<()> {
        self.bus
            .publish(PaymentEvent::UpdatePaymentStatus(StatusEvent {
                purchase_id: purchase_id.to_string(),
                status,
                three_d_secure_request,
            }))
            .await
    }
}

fn validate_request(
    req: &InitiatePaymentRequest,
) -> Result<(), (axum::http::StatusCode, ErrorEnvelope)> {
    if req.amount < 0.01 {
        return Err(bad_request("INVALID_AMOUNT", "amount must be at least 0.01"));
    }
    if req.cardholder_name.is_empty()
        || req.cardholder_name.len() > 45
        || !req
            .cardholder_name
            .chars()
            .all(|c| c.is_ascii_alphabetic() || " '.,-".contains(c))
    {
        return Err(bad_request("INVALID_CARDHOLDER_NAME", "invalid cardholder name"));
    }
    if !is_digits(&req.card_number) || req.card_number.len() < 12 || req.card_number.len() > 19 {
        return Err(bad_request("INVALID_CARD_NUMBER", "invalid card number"));
    }
    if !is_expiry(&req.expires) {
        return Err(bad_request("INVALID_EXPIRY", "expiry must be MM/YY"));
    }
    if !is_digits(&req.cvc) || req.cvc.len() < 3 || req.cvc.len() > 4 {
        return Err(bad_request("INVALID_CVC", "invalid cvc"));
    }
    Ok(())
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn is_expiry(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 5
        && bytes[2] == b'/'
        && s[..2].chars().all(|c| c.is_ascii_digit())
        && s[3..].chars().all(|c| c.is_ascii_digit())
}

fn bad_request(code: &str, message: &str) -> (axum::http::StatusCode, ErrorEnvelope) {
    (axum::http::StatusCode::BAD_REQUEST, err(code, message))
}

pub(crate) fn err(code: &str, message: &str) -> ErrorEnvelope {
    ErrorEnvelope {
        error: ErrorPayload {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        },
    }
}

pub(crate) fn internal(e: anyhow::Error) -> (axum::http::StatusCode, ErrorEnvelope) {
    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        err("INTERNAL_ERROR", &e.to_string()),
    )
}
