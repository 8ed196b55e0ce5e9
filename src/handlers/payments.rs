use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::errors::DomainError;
use crate::domain::order::order_number_from_ref;
use crate::domain::payment::{ConfirmationOutcome, PaymentConfirmation};
use crate::errors::AppError;
use crate::infrastructure::chapa::verify_webhook_signature;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-chapa-signature";

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentData {
    pub order_number: String,
    /// `completed`, `already_completed` or `failed`; absent when confirmation
    /// errored.
    pub outcome: Option<String>,
    /// Order confirmation page to send the customer to.
    pub redirect_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PaymentData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookPayload {
    pub tx_ref: String,
}

/// GET /payments/verify/{tx_ref}
///
/// Polling verification, also used as the gateway callback URL.
#[utoipa::path(
    get,
    path = "/payments/verify/{tx_ref}",
    params(("tx_ref" = String, Path, description = "Transaction reference, tx-<order number>")),
    responses(
        (status = 200, description = "Payment confirmed, or reported as failed", body = PaymentResponse),
        (status = 400, description = "Bad reference, or paid order could not be fulfilled", body = PaymentResponse),
        (status = 404, description = "Order not found", body = PaymentResponse),
        (status = 500, description = "Gateway or internal error", body = PaymentResponse),
    ),
    tag = "payments"
)]
pub async fn verify_payment(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let tx_ref = path.into_inner();
    confirm(&state, &tx_ref).await
}

/// POST /payments/webhook
///
/// Gateway-initiated confirmation. When a webhook secret is configured the
/// raw body must be signed in `x-chapa-signature`.
#[utoipa::path(
    post,
    path = "/payments/webhook",
    request_body = WebhookPayload,
    responses(
        (status = 200, description = "Payment confirmed, or reported as failed", body = PaymentResponse),
        (status = 400, description = "Malformed body or bad reference", body = PaymentResponse),
        (status = 401, description = "Missing or invalid signature"),
        (status = 404, description = "Order not found", body = PaymentResponse),
        (status = 500, description = "Gateway or internal error", body = PaymentResponse),
    ),
    tag = "payments"
)]
pub async fn payment_webhook(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    if let Some(secret) = &state.webhook_secret {
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;
        if !verify_webhook_signature(&body, signature, secret) {
            log::warn!("Rejected webhook with invalid signature");
            return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
        }
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook body: {e}")))?;

    Ok(confirm(&state, &payload.tx_ref).await)
}

async fn confirm(state: &AppState, tx_ref: &str) -> HttpResponse {
    match state.payments.confirm(tx_ref).await {
        Ok(confirmation) => confirmed(confirmation),
        Err(e) => rejected(state, tx_ref, e),
    }
}

fn confirmed(c: PaymentConfirmation) -> HttpResponse {
    let (outcome, message) = match c.outcome {
        ConfirmationOutcome::Completed => ("completed", "Payment confirmed"),
        ConfirmationOutcome::AlreadyCompleted => ("already_completed", "Payment already confirmed"),
        ConfirmationOutcome::Failed => ("failed", "Payment was not successful"),
    };
    HttpResponse::Ok().json(PaymentResponse {
        success: c.is_success(),
        message: Some(message.to_string()),
        data: Some(PaymentData {
            order_number: c.order_number,
            outcome: Some(outcome.to_string()),
            redirect_url: c.redirect_url,
        }),
    })
}

/// Error body in the payment envelope; the redirect is kept whenever the
/// reference names an order so the customer still lands on its page.
fn rejected(state: &AppState, tx_ref: &str, e: DomainError) -> HttpResponse {
    let data = match &e {
        DomainError::InvalidReference(_) | DomainError::OrderNotFound(_) => None,
        _ => order_number_from_ref(tx_ref).ok().map(|n| PaymentData {
            order_number: n.to_string(),
            outcome: None,
            redirect_url: state.payments.redirect_url(n),
        }),
    };
    let err = AppError::from(e);
    let status = err.status_code();
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("Payment confirmation for {} failed: {}", tx_ref, err);
        "Payment verification failed".to_string()
    } else {
        err.to_string()
    };
    HttpResponse::build(status).json(PaymentResponse {
        success: false,
        data,
        message: Some(message),
    })
}
