use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::DomainError;

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "audience", content = "user_id", rename_all = "snake_case")]
pub enum Recipient {
    Customer(Uuid),
    Staff,
}

impl Recipient {
    pub fn audience(&self) -> &'static str {
        match self {
            Recipient::Customer(_) => "customer",
            Recipient::Staff => "staff",
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Recipient::Customer(id) => Some(*id),
            Recipient::Staff => None,
        }
    }

    pub fn from_parts(audience: &str, user_id: Option<Uuid>) -> Result<Self, DomainError> {
        match (audience, user_id) {
            ("customer", Some(id)) => Ok(Recipient::Customer(id)),
            ("staff", _) => Ok(Recipient::Staff),
            (other, _) => Err(DomainError::Internal(format!(
                "invalid notification audience '{other}'"
            ))),
        }
    }
}

/// Metadata shapes the storefront knows how to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KnownMetadata {
    OrderStatus {
        order_number: String,
        status: String,
    },
    PaymentCompleted {
        order_number: String,
        amount: String,
    },
    PaymentFailed {
        order_number: String,
        gateway_status: String,
    },
    FulfillmentEscalated {
        order_number: String,
        attempts: i32,
        reason: String,
    },
    LowStock {
        product_id: Uuid,
        quantity: i32,
    },
}

/// Notification payload: a known shape, or whatever JSON an older writer left
/// behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationMetadata {
    Known(KnownMetadata),
    Opaque(Value),
}

impl From<KnownMetadata> for NotificationMetadata {
    fn from(m: KnownMetadata) -> Self {
        NotificationMetadata::Known(m)
    }
}

impl NotificationMetadata {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_json(value: Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(NotificationMetadata::Opaque(value))
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient: Recipient,
    pub title: String,
    pub message: String,
    pub metadata: NotificationMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub id: Uuid,
    pub recipient: Recipient,
    pub title: String,
    pub message: String,
    pub metadata: NotificationMetadata,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
