use bigdecimal::BigDecimal;
use serde_json::Value;

/// Everything the hosted checkout needs to start a payment.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: BigDecimal,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub tx_ref: String,
    pub callback_url: String,
    pub return_url: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub checkout_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Success,
    /// Any other provider status, kept verbatim.
    Other(String),
}

impl VerificationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, VerificationStatus::Success)
    }

    pub fn as_str(&self) -> &str {
        match self {
            VerificationStatus::Success => "success",
            VerificationStatus::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Verification {
    pub status: VerificationStatus,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Stock reserved and order moved to processing by this call.
    Completed,
    /// The order was already paid; nothing was written.
    AlreadyCompleted,
    /// The gateway reported a non-success status; the order is marked failed.
    Failed,
}

#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub order_number: String,
    pub outcome: ConfirmationOutcome,
    pub redirect_url: String,
}

impl PaymentConfirmation {
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, ConfirmationOutcome::Failed)
    }
}
