//! Chapa hosted-checkout integration via REST API (no SDK dependency).

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;

use crate::config::GatewayConfig;
use crate::domain::errors::DomainError;
use crate::domain::payment::{CheckoutSession, PaymentRequest, Verification, VerificationStatus};
use crate::domain::ports::PaymentGateway;

pub struct ChapaGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl ChapaGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    amount: String,
    currency: &'a str,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    tx_ref: &'a str,
    callback_url: &'a str,
    return_url: &'a str,
    customization: Customization<'a>,
}

#[derive(Debug, Serialize)]
struct Customization<'a> {
    title: &'a str,
    description: &'a str,
}

impl From<reqwest::Error> for DomainError {
    fn from(e: reqwest::Error) -> Self {
        DomainError::Gateway(e.to_string())
    }
}

#[async_trait]
impl PaymentGateway for ChapaGateway {
    async fn initialize(&self, request: &PaymentRequest) -> Result<CheckoutSession, DomainError> {
        let body = InitializeBody {
            amount: request.amount.to_string(),
            currency: &request.currency,
            email: &request.email,
            first_name: &request.first_name,
            last_name: &request.last_name,
            tx_ref: &request.tx_ref,
            callback_url: &request.callback_url,
            return_url: &request.return_url,
            customization: Customization {
                title: &request.title,
                description: &request.description,
            },
        };

        let resp = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let payload: Value = resp.json().await?;

        log::debug!("Chapa initialize {} -> {}", request.tx_ref, status);
        checkout_session_from(status, &payload)
    }

    async fn verify(&self, tx_ref: &str) -> Result<Verification, DomainError> {
        let resp = self
            .client
            .get(format!("{}/transaction/verify/{}", self.base_url, tx_ref))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let status = resp.status();
        let payload: Value = resp.json().await?;

        log::debug!("Chapa verify {} -> {}", tx_ref, status);
        verification_from(status, payload)
    }
}

fn provider_message(payload: &Value) -> String {
    match &payload["message"] {
        Value::String(s) => s.clone(),
        Value::Null => "no message".to_string(),
        other => other.to_string(),
    }
}

fn checkout_session_from(status: StatusCode, payload: &Value) -> Result<CheckoutSession, DomainError> {
    if !status.is_success() || payload["status"].as_str() != Some("success") {
        return Err(DomainError::Gateway(format!(
            "initialize failed ({status}): {}",
            provider_message(payload)
        )));
    }
    payload["data"]["checkout_url"]
        .as_str()
        .map(|url| CheckoutSession {
            checkout_url: url.to_string(),
        })
        .ok_or_else(|| DomainError::Gateway("initialize response has no checkout_url".to_string()))
}

fn verification_from(status: StatusCode, payload: Value) -> Result<Verification, DomainError> {
    if !status.is_success() {
        return Err(DomainError::Gateway(format!(
            "verify failed ({status}): {}",
            provider_message(&payload)
        )));
    }
    let request_ok = payload["status"].as_str() == Some("success");
    let payment_status = payload["data"]["status"].as_str().unwrap_or("unknown");
    let status = if request_ok && payment_status == "success" {
        VerificationStatus::Success
    } else {
        VerificationStatus::Other(payment_status.to_string())
    };
    Ok(Verification { status, payload })
}

/// Checks a webhook body against its hex HMAC-SHA256 signature.
pub fn verify_webhook_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(sig_bytes) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    // constant-time comparison
    mac.verify_slice(&sig_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sign(payload: &[u8], secret: &str) -> String {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn initialize_returns_checkout_url() {
        let payload = json!({
            "message": "Hosted Link",
            "status": "success",
            "data": {"checkout_url": "https://checkout.chapa.co/checkout/payment/abc"}
        });
        let session = checkout_session_from(StatusCode::OK, &payload).expect("session");
        assert_eq!(
            session.checkout_url,
            "https://checkout.chapa.co/checkout/payment/abc"
        );
    }

    #[test]
    fn initialize_failure_flag_is_a_gateway_error() {
        let payload = json!({"message": "Invalid currency", "status": "failed", "data": null});
        let err = checkout_session_from(StatusCode::OK, &payload).expect_err("failed flag");
        assert!(matches!(err, DomainError::Gateway(msg) if msg.contains("Invalid currency")));
    }

    #[test]
    fn initialize_http_error_is_a_gateway_error() {
        let payload = json!({"message": {"email": ["invalid"]}, "status": "failed"});
        let err = checkout_session_from(StatusCode::BAD_REQUEST, &payload).expect_err("400");
        assert!(matches!(err, DomainError::Gateway(_)));
    }

    #[test]
    fn verify_success_requires_both_statuses() {
        let ok = verification_from(
            StatusCode::OK,
            json!({"status": "success", "data": {"status": "success", "tx_ref": "tx-ORD-1"}}),
        )
        .expect("verification");
        assert_eq!(ok.status, VerificationStatus::Success);
        assert_eq!(ok.payload["data"]["tx_ref"], "tx-ORD-1");

        let pending = verification_from(
            StatusCode::OK,
            json!({"status": "success", "data": {"status": "pending"}}),
        )
        .expect("verification");
        assert_eq!(pending.status, VerificationStatus::Other("pending".to_string()));
    }

    #[test]
    fn verify_http_error_is_a_gateway_error() {
        let err = verification_from(
            StatusCode::NOT_FOUND,
            json!({"message": "Invalid transaction or Transaction not found", "status": "failed"}),
        )
        .expect_err("404");
        assert!(matches!(err, DomainError::Gateway(_)));
    }

    #[test]
    fn webhook_signature_accepts_matching_hmac() {
        let body = br#"{"tx_ref":"tx-ORD-1","status":"success"}"#;
        let signature = sign(body, "whsec_test");
        assert!(verify_webhook_signature(body, &signature, "whsec_test"));
    }

    #[test]
    fn webhook_signature_rejects_tampering_and_garbage() {
        let body = br#"{"tx_ref":"tx-ORD-1","status":"success"}"#;
        let signature = sign(body, "whsec_test");
        assert!(!verify_webhook_signature(b"{\"tx_ref\":\"tx-ORD-2\"}", &signature, "whsec_test"));
        assert!(!verify_webhook_signature(body, &signature, "other_secret"));
        assert!(!verify_webhook_signature(body, "not-hex", "whsec_test"));
        assert!(!verify_webhook_signature(body, "", "whsec_test"));
    }
}
