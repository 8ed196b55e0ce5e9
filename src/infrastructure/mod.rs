pub mod chapa;
pub mod models;
pub mod notification_hub;
pub mod notification_repo;
pub mod order_repo;
pub mod product_repo;
