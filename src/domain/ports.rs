use async_trait::async_trait;
use uuid::Uuid;

use super::errors::DomainError;
use super::notification::{NewNotification, NotificationView, Recipient};
use super::order::{
    CompletionOutcome, ListResult, NewOrder, OrderStatus, OrderView, PaymentSnapshot,
    PendingFulfillment,
};
use super::payment::{CheckoutSession, PaymentRequest, Verification};
use super::product::{NewProduct, ProductPage, ProductView, StockLevel};

pub trait OrderRepository: Send + Sync + 'static {
    fn create(&self, order: NewOrder) -> Result<OrderView, DomainError>;
    fn find_by_number(&self, order_number: &str) -> Result<Option<OrderView>, DomainError>;
    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError>;

    fn payment_snapshot(&self, order_number: &str)
        -> Result<Option<PaymentSnapshot>, DomainError>;

    /// In one transaction: flip the order to completed/processing if its
    /// payment is still completable, then take every line item out of stock.
    /// Any failure rolls the whole thing back.
    fn complete_payment(&self, order_number: &str) -> Result<CompletionOutcome, DomainError>;

    /// Marks the payment failed unless it has already completed.
    fn mark_payment_failed(&self, order_number: &str) -> Result<(), DomainError>;

    fn list_awaiting_stock(&self, limit: i64) -> Result<Vec<PendingFulfillment>, DomainError>;

    /// Records a failed fulfillment try: bumps the attempt counter and leaves
    /// the order `awaiting_stock`, or `escalated` when `escalate` is set.
    /// Returns the new attempt count.
    fn record_fulfillment_attempt(
        &self,
        order_number: &str,
        note: &str,
        escalate: bool,
    ) -> Result<i32, DomainError>;

    /// Moves the order from `from` to `to`; fails with `InvalidTransition`
    /// if the order is no longer in `from`.
    fn update_status(
        &self,
        order_number: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<OrderView, DomainError>;
}

pub trait ProductRepository: Send + Sync + 'static {
    fn create(&self, product: NewProduct) -> Result<ProductView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<ProductView>, DomainError>;
    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<ProductView>, DomainError>;
    fn list(&self, page: i64, limit: i64) -> Result<ProductPage, DomainError>;
    fn set_stock(&self, id: Uuid, stock: StockLevel) -> Result<ProductView, DomainError>;
}

pub trait NotificationRepository: Send + Sync + 'static {
    fn create(&self, notification: NewNotification) -> Result<NotificationView, DomainError>;
    fn list(
        &self,
        recipient: Recipient,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<NotificationView>, DomainError>;
    fn mark_read(&self, id: Uuid) -> Result<NotificationView, DomainError>;
    fn mark_all_read(&self, recipient: Recipient) -> Result<usize, DomainError>;
    fn unread_count(&self, recipient: Recipient) -> Result<i64, DomainError>;
}

/// Fans a freshly stored notification out to connected clients.
pub trait NotificationPublisher: Send + Sync + 'static {
    fn publish(&self, notification: &NotificationView);
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn initialize(&self, request: &PaymentRequest) -> Result<CheckoutSession, DomainError>;
    async fn verify(&self, tx_ref: &str) -> Result<Verification, DomainError>;
}
