use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    EUR,
    USD,
    GBP,
}

impl Currency {
    /// ISO 4217 code, as the gateway expects it on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Currency::EUR => "EUR",
            Currency::USD => "USD",
            Currency::GBP => "GBP",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub amount: f64,
    pub currency: Currency,
    pub cardholder_name: String,
    pub card_number: String,
    pub expires: String,
    pub cvc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    pub purchase_id: String,
}

/// `Executed` and `Failed` are terminal. `Pending` means "await a further
/// signal" (the webhook path); `ThreeDSecureRequired` is always followed
/// eventually by a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Executed,
    Failed,
    ThreeDSecureRequired,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Executed | PaymentStatus::Failed)
    }
}

/// Challenge the browser must perform, derived from the gateway's 3DS
/// descriptor. Never stored; travels inside `StatusEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDSecureRequest {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ThreeDSecureBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDSecureBody {
    #[serde(rename = "MD")]
    pub md: String,
    #[serde(rename = "PaReq")]
    pub pa_req: String,
    #[serde(rename = "TermUrl")]
    pub term_url: String,
}

/// Body of the browser's return POST after the bank challenge.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThreeDSecureCallback {
    #[serde(rename = "MD", default)]
    pub md: Option<String>,
    #[serde(rename = "PaRes")]
    pub pa_res: String,
}

/// The single durable record of this system: one pending 3DS challenge per
/// purchase, consumed exactly once or swept after TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreeDSecureCorrelation {
    pub purchase_id: String,
    pub callback_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub purchase_id: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_d_secure_request: Option<ThreeDSecureRequest>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}
