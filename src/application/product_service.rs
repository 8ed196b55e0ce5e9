use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::notification::{KnownMetadata, Recipient};
use crate::domain::order::Role;
use crate::domain::ports::ProductRepository;
use crate::domain::product::{NewProduct, ProductPage, ProductView, StockLevel};

use super::notification_service::NotificationService;

pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
    notifications: Arc<NotificationService>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>, notifications: Arc<NotificationService>) -> Self {
        Self {
            repo,
            notifications,
        }
    }

    pub fn create_product(
        &self,
        product: NewProduct,
        role: Role,
    ) -> Result<ProductView, DomainError> {
        require_staff(role)?;
        if product.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("name must not be empty".to_string()));
        }
        if product.price < BigDecimal::from(0) {
            return Err(DomainError::InvalidInput("price must not be negative".to_string()));
        }
        if product.quantity < 0 {
            return Err(DomainError::InvalidInput(
                "quantity must not be negative".to_string(),
            ));
        }
        self.repo.create(product)
    }

    pub fn get_product(&self, id: Uuid) -> Result<ProductView, DomainError> {
        self.repo
            .find_by_id(id)?
            .ok_or(DomainError::ProductNotFound(id))
    }

    pub fn list_products(&self, page: i64, limit: i64) -> Result<ProductPage, DomainError> {
        self.repo.list(page.max(1), limit.clamp(1, 100))
    }

    /// Overwrites the stock level; `in_stock` follows the new quantity.
    pub fn set_stock(&self, id: Uuid, quantity: i32, role: Role) -> Result<ProductView, DomainError> {
        require_staff(role)?;
        if quantity < 0 {
            return Err(DomainError::InvalidInput(
                "quantity must not be negative".to_string(),
            ));
        }
        let stock = StockLevel::new(quantity);
        let product = self.repo.set_stock(id, stock)?;
        log::info!("Stock for product {} set to {}", id, quantity);

        if stock.is_low() {
            self.notifications.notify_quietly(
                Recipient::Staff,
                "Low stock",
                format!("{} has {} left", product.name, product.quantity),
                KnownMetadata::LowStock {
                    product_id: id,
                    quantity: product.quantity,
                },
            );
        }
        Ok(product)
    }
}

fn require_staff(role: Role) -> Result<(), DomainError> {
    if role.is_staff() && role != Role::Carrier {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "catalog changes need a manager or admin".to_string(),
        ))
    }
}
