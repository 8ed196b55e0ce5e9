pub mod errors;
pub mod notification;
pub mod order;
pub mod payment;
pub mod ports;
pub mod product;
