use std::sync::Arc;

use crate::application::notification_service::NotificationService;
use crate::application::order_service::OrderService;
use crate::application::payment_service::PaymentService;
use crate::application::product_service::ProductService;
use crate::infrastructure::notification_hub::NotificationHub;

/// Shared handler state, cloned into every actix worker.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub products: Arc<ProductService>,
    pub payments: Arc<PaymentService>,
    pub notifications: Arc<NotificationService>,
    pub hub: Arc<NotificationHub>,
    /// When set, webhook bodies must be signed with it.
    pub webhook_secret: Option<String>,
}
