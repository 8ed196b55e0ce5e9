use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found")]
    NotFound,
    #[error("Order {0} not found")]
    OrderNotFound(String),
    #[error("Order {0} was cancelled")]
    OrderCancelled(String),
    #[error("Product {0} not found")]
    ProductNotFound(Uuid),
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },
    #[error("Invalid transaction reference: {0}")]
    InvalidReference(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Errors that abort the fulfillment transaction after the gateway has
    /// already confirmed the payment.
    pub fn is_stock_abort(&self) -> bool {
        matches!(
            self,
            DomainError::ProductNotFound(_) | DomainError::InsufficientStock { .. }
        )
    }
}

impl From<tokio::task::JoinError> for DomainError {
    fn from(e: tokio::task::JoinError) -> Self {
        DomainError::Internal(e.to_string())
    }
}
