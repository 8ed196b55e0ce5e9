use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::{CheckoutLine, CheckoutRequest};
use crate::domain::order::{Customer, FulfillmentStatus, OrderStatus, OrderView, PaymentStatus};
use crate::errors::AppError;
use crate::state::AppState;

use super::{caller_role, PageParams};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub shipping_address_id: Option<Uuid>,
    pub billing_address_id: Option<Uuid>,
    pub items: Vec<CheckoutItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_number: String,
    /// Hosted checkout page the customer should be sent to.
    pub checkout_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    /// Decimal amounts are rendered as strings, e.g. "9.99"
    pub unit_price: String,
    pub subtotal: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub customer_email: String,
    pub subtotal: String,
    pub tax: String,
    pub shipping: String,
    pub total: String,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub transaction_ref: Option<String>,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        Self {
            id: o.id,
            order_number: o.order_number,
            customer_id: o.customer_id,
            customer_email: o.customer_email,
            subtotal: o.subtotal.to_string(),
            tax: o.tax.to_string(),
            shipping: o.shipping.to_string(),
            total: o.total.to_string(),
            order_status: o.order_status,
            payment_status: o.payment_status,
            fulfillment_status: o.fulfillment_status,
            transaction_ref: o.transaction_ref,
            created_at: o.created_at.to_rfc3339(),
            items: o
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    product_id: i.product_id,
                    name: i.name,
                    quantity: i.quantity,
                    unit_price: i.unit_price.to_string(),
                    subtotal: i.subtotal.to_string(),
                    image_url: i.image_url,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Checkout: stores a pending order with snapshotted line items and opens a
/// hosted payment session for it. Stock is only reserved once the payment is
/// confirmed.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created, payment initialized", body = CreateOrderResponse),
        (status = 400, description = "Empty cart, bad quantity or not enough stock"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let request = CheckoutRequest {
        customer: Customer {
            id: body.customer_id,
            email: body.email,
            first_name: body.first_name,
            last_name: body.last_name,
        },
        shipping_address_id: body.shipping_address_id,
        billing_address_id: body.billing_address_id,
        lines: body
            .items
            .into_iter()
            .map(|i| CheckoutLine {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect(),
    };

    let result = state.orders.checkout(request).await?;

    Ok(HttpResponse::Created().json(CreateOrderResponse {
        order_number: result.order.order_number,
        checkout_url: result.checkout_url,
    }))
}

/// GET /orders/{order_number}
#[utoipa::path(
    get,
    path = "/orders/{order_number}",
    params(
        ("order_number" = String, Path, description = "Order number, e.g. ORD-20260101120000-1A2B3C"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_number = path.into_inner();
    let orders = state.orders.clone();

    let order = web::block(move || orders.get_order(&order_number)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Newest first. Use `page` (1-based) and `limit` to control pagination.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let orders = state.orders.clone();

    let result = web::block(move || orders.list_orders(page, limit)).await??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// PATCH /orders/{order_number}/status
///
/// Manual status change. The caller's role comes from the `x-user-role`
/// header; carriers may only ship and deliver.
#[utoipa::path(
    patch,
    path = "/orders/{order_number}/status",
    params(
        ("order_number" = String, Path, description = "Order number"),
        ("x-user-role" = Option<String>, Header, description = "customer | carrier | manager | admin"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Role may not set this status"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let role = caller_role(&req)?;
    let order_number = path.into_inner();
    let next = body.into_inner().status;
    let orders = state.orders.clone();

    let order = web::block(move || orders.update_status(&order_number, next, role)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
