use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;

pub const TX_REF_PREFIX: &str = "tx-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Transitions reachable through a manual status update. `processing`
    /// only ever follows a completed payment, so nothing leads to it here.
    pub fn manual_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Cancelled],
            OrderStatus::Processing => &[
                OrderStatus::Shipped,
                OrderStatus::Cancelled,
                OrderStatus::Refunded,
            ],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered => &[OrderStatus::Refunded],
            OrderStatus::Cancelled | OrderStatus::Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.manual_transitions().contains(&next)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(DomainError::Internal(format!("unknown order status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Statuses from which a verified payment may still be completed.
    pub const COMPLETABLE: [PaymentStatus; 2] = [PaymentStatus::Pending, PaymentStatus::Failed];
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::Internal(format!("unknown payment status '{other}'"))),
        }
    }
}

/// Tracks orders whose payment was confirmed by the gateway but whose stock
/// could not be reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    None,
    AwaitingStock,
    Fulfilled,
    Escalated,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::None => "none",
            FulfillmentStatus::AwaitingStock => "awaiting_stock",
            FulfillmentStatus::Fulfilled => "fulfilled",
            FulfillmentStatus::Escalated => "escalated",
        }
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FulfillmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(FulfillmentStatus::None),
            "awaiting_stock" => Ok(FulfillmentStatus::AwaitingStock),
            "fulfilled" => Ok(FulfillmentStatus::Fulfilled),
            "escalated" => Ok(FulfillmentStatus::Escalated),
            other => Err(DomainError::Internal(format!(
                "unknown fulfillment status '{other}'"
            ))),
        }
    }
}

/// Caller role, as asserted by the upstream session provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Carrier,
    Manager,
    Admin,
}

impl Role {
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Customer)
    }

    /// Whether this role may move an order into `next`.
    pub fn may_set(&self, next: OrderStatus) -> bool {
        match self {
            Role::Admin | Role::Manager => true,
            Role::Carrier => matches!(next, OrderStatus::Shipped | OrderStatus::Delivered),
            Role::Customer => false,
        }
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "carrier" => Ok(Role::Carrier),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::InvalidInput(format!("unknown role '{other}'"))),
        }
    }
}

// ── Order values ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub customer_email: String,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub shipping: BigDecimal,
    pub total: BigDecimal,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub transaction_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<OrderView>,
    pub total: i64,
}

/// Customer identity carried on the order and forwarded to the gateway.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Line item snapshot taken from the live product at checkout.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub image_url: Option<String>,
}

impl NewOrderItem {
    pub fn subtotal(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub customer: Customer,
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
    pub items: Vec<NewOrderItem>,
    pub totals: OrderTotals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTotals {
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub shipping: BigDecimal,
    pub total: BigDecimal,
}

impl OrderTotals {
    pub fn compute(items: &[NewOrderItem], tax_rate: &BigDecimal, shipping: &BigDecimal) -> Self {
        let subtotal = items
            .iter()
            .fold(BigDecimal::from(0), |acc, item| acc + item.subtotal())
            .with_scale_round(2, RoundingMode::HalfUp);
        let tax = (&subtotal * tax_rate).with_scale_round(2, RoundingMode::HalfUp);
        let shipping = shipping.with_scale_round(2, RoundingMode::HalfUp);
        let total = &subtotal + &tax + &shipping;
        Self {
            subtotal,
            tax,
            shipping,
            total,
        }
    }
}

/// Minimal projection read before deciding whether to confirm a payment.
#[derive(Debug, Clone)]
pub struct PaymentSnapshot {
    pub order_number: String,
    pub customer_id: Uuid,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub total: BigDecimal,
    pub items: Vec<ItemDemand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemDemand {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// This call completed the payment and reserved the stock.
    Completed,
    /// Another caller completed it first; nothing was written.
    AlreadyCompleted,
}

#[derive(Debug, Clone)]
pub struct PendingFulfillment {
    pub order_number: String,
    pub customer_id: Uuid,
    pub attempts: i32,
}

// ── Order numbers and transaction references ────────────────────────────────

pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "ORD-{}-{}",
        now.format("%Y%m%d%H%M%S"),
        suffix.get(..6).unwrap_or(&suffix).to_uppercase()
    )
}

pub fn transaction_ref(order_number: &str) -> String {
    format!("{TX_REF_PREFIX}{order_number}")
}

/// Extracts the order number following the first `tx-` in a reference.
pub fn order_number_from_ref(tx_ref: &str) -> Result<&str, DomainError> {
    match tx_ref.split_once(TX_REF_PREFIX) {
        Some((_, order_number)) if !order_number.trim().is_empty() => Ok(order_number.trim()),
        _ => Err(DomainError::InvalidReference(tx_ref.to_string())),
    }
}
