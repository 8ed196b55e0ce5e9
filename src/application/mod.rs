pub mod notification_service;
pub mod order_service;
pub mod payment_service;
pub mod product_service;
pub mod reconciliation;
