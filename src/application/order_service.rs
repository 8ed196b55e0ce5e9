use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::CheckoutSettings;
use crate::domain::errors::DomainError;
use crate::domain::notification::{KnownMetadata, Recipient};
use crate::domain::order::{
    generate_order_number, transaction_ref, Customer, ListResult, NewOrder, NewOrderItem,
    OrderStatus, OrderTotals, OrderView, Role,
};
use crate::domain::payment::PaymentRequest;
use crate::domain::ports::{OrderRepository, PaymentGateway, ProductRepository};

use super::notification_service::NotificationService;

#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer: Customer,
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
    pub lines: Vec<CheckoutLine>,
}

#[derive(Debug, Clone)]
pub struct CheckoutResult {
    pub order: OrderView,
    pub checkout_url: String,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifications: Arc<NotificationService>,
    settings: CheckoutSettings,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifications: Arc<NotificationService>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            orders,
            products,
            gateway,
            notifications,
            settings,
        }
    }

    /// Creates a pending order from the cart and opens a hosted checkout for it.
    ///
    /// Stock is checked but not reserved here; it is taken out only once the
    /// payment is confirmed.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutResult, DomainError> {
        validate_checkout(&request)?;

        let products = self.products.clone();
        let ids: Vec<Uuid> = request.lines.iter().map(|l| l.product_id).collect();
        let catalog = tokio::task::spawn_blocking(move || products.find_many(&ids)).await??;
        let catalog: HashMap<Uuid, _> = catalog.into_iter().map(|p| (p.id, p)).collect();

        let mut demand: HashMap<Uuid, i32> = HashMap::new();
        let mut items = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = catalog
                .get(&line.product_id)
                .ok_or(DomainError::ProductNotFound(line.product_id))?;
            let wanted = demand.entry(product.id).or_insert(0);
            *wanted = wanted.checked_add(line.quantity).ok_or_else(|| {
                DomainError::InvalidInput(format!(
                    "total quantity for product {} is too large",
                    product.id
                ))
            })?;
            if *wanted > product.quantity {
                return Err(DomainError::InsufficientStock {
                    product_id: product.id,
                    requested: *wanted,
                    available: product.quantity,
                });
            }
            items.push(NewOrderItem {
                product_id: product.id,
                name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price.clone(),
                image_url: product.image_url.clone(),
            });
        }

        let totals = OrderTotals::compute(&items, &self.settings.tax_rate, &self.settings.shipping_fee);
        let new_order = NewOrder {
            order_number: generate_order_number(Utc::now()),
            customer: request.customer.clone(),
            shipping_address_id: request.shipping_address_id,
            billing_address_id: request.billing_address_id,
            items,
            totals,
        };

        let orders = self.orders.clone();
        let order = tokio::task::spawn_blocking(move || orders.create(new_order)).await??;
        log::info!(
            "Order {} created for customer {} (total {})",
            order.order_number,
            order.customer_id,
            order.total
        );

        let tx_ref = transaction_ref(&order.order_number);
        let session = self
            .gateway
            .initialize(&PaymentRequest {
                amount: order.total.clone(),
                currency: self.settings.currency.clone(),
                email: request.customer.email.clone(),
                first_name: request.customer.first_name.clone(),
                last_name: request.customer.last_name.clone(),
                callback_url: self.settings.callback_url(&tx_ref),
                return_url: self.settings.confirmation_url(&order.order_number),
                title: "Order payment".to_string(),
                description: format!("Payment for order {}", order.order_number),
                tx_ref,
            })
            .await?;

        Ok(CheckoutResult {
            order,
            checkout_url: session.checkout_url,
        })
    }

    pub fn get_order(&self, order_number: &str) -> Result<OrderView, DomainError> {
        self.orders
            .find_by_number(order_number)?
            .ok_or_else(|| DomainError::OrderNotFound(order_number.to_string()))
    }

    pub fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        self.orders.list(page.max(1), limit.clamp(1, 100))
    }

    /// Manual status change by back-office staff.
    pub fn update_status(
        &self,
        order_number: &str,
        next: OrderStatus,
        role: Role,
    ) -> Result<OrderView, DomainError> {
        if !role.may_set(next) {
            return Err(DomainError::Forbidden(format!(
                "{role:?} may not set orders to {next}"
            )));
        }

        let current = self.get_order(order_number)?;
        if !current.order_status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: current.order_status.to_string(),
                to: next.to_string(),
            });
        }

        let updated = self
            .orders
            .update_status(order_number, current.order_status, next)?;
        log::info!(
            "Order {} moved {} -> {} by {:?}",
            order_number,
            current.order_status,
            next,
            role
        );

        self.notifications.notify_quietly(
            Recipient::Customer(updated.customer_id),
            "Order update",
            format!("Your order {} is now {}", order_number, next),
            KnownMetadata::OrderStatus {
                order_number: order_number.to_string(),
                status: next.to_string(),
            },
        );
        Ok(updated)
    }
}

fn validate_checkout(request: &CheckoutRequest) -> Result<(), DomainError> {
    if request.lines.is_empty() {
        return Err(DomainError::InvalidInput("cart is empty".to_string()));
    }
    if let Some(line) = request.lines.iter().find(|l| l.quantity <= 0) {
        return Err(DomainError::InvalidInput(format!(
            "quantity for product {} must be positive",
            line.product_id
        )));
    }
    if request.customer.email.trim().is_empty() {
        return Err(DomainError::InvalidInput("email is required".to_string()));
    }
    Ok(())
}
