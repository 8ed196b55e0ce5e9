pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use utoipa::OpenApi;

use crate::domain::order::Role;
use crate::errors::AppError;

/// Role asserted by the upstream session layer.
pub const ROLE_HEADER: &str = "x-user-role";

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        products::list_products,
        products::get_product,
        products::create_product,
        products::set_stock,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        payments::verify_payment,
        payments::payment_webhook,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::stream_notifications,
    ),
    tags(
        (name = "products", description = "Catalog and stock"),
        (name = "orders", description = "Checkout and order tracking"),
        (name = "payments", description = "Payment confirmation"),
        (name = "notifications", description = "Customer and staff notifications"),
    )
)]
pub struct ApiDoc;

/// Registers every route; shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .service(
            web::scope("/products")
                .route("", web::get().to(products::list_products))
                .route("", web::post().to(products::create_product))
                .route("/{id}", web::get().to(products::get_product))
                .route("/{id}/stock", web::put().to(products::set_stock)),
        )
        .service(
            web::scope("/orders")
                .route("", web::post().to(orders::create_order))
                .route("", web::get().to(orders::list_orders))
                .route("/{order_number}", web::get().to(orders::get_order))
                .route(
                    "/{order_number}/status",
                    web::patch().to(orders::update_order_status),
                ),
        )
        .service(
            web::scope("/payments")
                .route("/verify/{tx_ref}", web::get().to(payments::verify_payment))
                .route("/webhook", web::post().to(payments::payment_webhook)),
        )
        .service(
            web::scope("/notifications")
                .route("", web::get().to(notifications::list_notifications))
                .route("/unread-count", web::get().to(notifications::unread_count))
                .route("/stream", web::get().to(notifications::stream_notifications))
                .route("/read-all", web::post().to(notifications::mark_all_read))
                .route("/{id}/read", web::post().to(notifications::mark_read)),
        );
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "orders"
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Caller role from [`ROLE_HEADER`]; anonymous callers are customers.
pub fn caller_role(req: &HttpRequest) -> Result<Role, AppError> {
    match req.headers().get(ROLE_HEADER) {
        None => Ok(Role::Customer),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AppError::BadRequest(format!("{ROLE_HEADER} is not valid text")))?;
            Ok(value.parse::<Role>()?)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn missing_role_header_means_customer() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(caller_role(&req).unwrap(), Role::Customer);
    }

    #[test]
    fn role_header_is_case_insensitive() {
        let req = TestRequest::default()
            .insert_header((ROLE_HEADER, "Carrier"))
            .to_http_request();
        assert_eq!(caller_role(&req).unwrap(), Role::Carrier);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let req = TestRequest::default()
            .insert_header((ROLE_HEADER, "superuser"))
            .to_http_request();
        assert!(matches!(caller_role(&req), Err(AppError::BadRequest(_))));
    }
}
