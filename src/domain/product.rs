use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Stock at or below this level raises a staff notification.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub image_url: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct ProductPage {
    pub items: Vec<ProductView>,
    pub total: i64,
}

/// Stock level after taking `requested` units out of `available`.
///
/// Returns `None` when there is not enough stock.
pub fn decrement(available: i32, requested: i32) -> Option<StockLevel> {
    if requested <= 0 || available < requested {
        return None;
    }
    Some(StockLevel::new(available - requested))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub quantity: i32,
    pub in_stock: bool,
}

impl StockLevel {
    pub fn new(quantity: i32) -> Self {
        Self {
            quantity,
            in_stock: quantity > 0,
        }
    }

    pub fn is_low(&self) -> bool {
        self.quantity <= LOW_STOCK_THRESHOLD
    }
}
