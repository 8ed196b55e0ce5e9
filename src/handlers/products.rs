use std::str::FromStr;

use actix_web::{web, HttpRequest, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::product::{NewProduct, ProductView};
use crate::errors::AppError;
use crate::state::AppState;

use super::{caller_role, PageParams};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
    pub image_url: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStockRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub in_stock: bool,
    pub updated_at: String,
}

impl From<ProductView> for ProductResponse {
    fn from(p: ProductView) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price.to_string(),
            image_url: p.image_url,
            quantity: p.quantity,
            in_stock: p.in_stock,
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListProductsResponse {
    pub items: Vec<ProductResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// GET /products
#[utoipa::path(
    get,
    path = "/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of products", body = ListProductsResponse),
    ),
    tag = "products"
)]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let products = state.products.clone();

    let result = web::block(move || products.list_products(page, limit)).await??;

    Ok(HttpResponse::Ok().json(ListProductsResponse {
        items: result.items.into_iter().map(ProductResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let products = state.products.clone();

    let product = web::block(move || products.get_product(id)).await??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// POST /products
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    params(("x-user-role" = Option<String>, Header, description = "manager | admin")),
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product"),
        (status = 403, description = "Caller is not a manager or admin"),
    ),
    tag = "products"
)]
pub async fn create_product(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let role = caller_role(&req)?;
    let body = body.into_inner();
    let price = BigDecimal::from_str(&body.price)
        .map_err(|e| AppError::BadRequest(format!("Invalid price '{}': {}", body.price, e)))?;
    let new_product = NewProduct {
        name: body.name,
        description: body.description,
        price,
        image_url: body.image_url,
        quantity: body.quantity,
    };
    let products = state.products.clone();

    let product = web::block(move || products.create_product(new_product, role)).await??;

    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// PUT /products/{id}/stock
///
/// Overwrites the stock level. Dropping to the low-stock threshold notifies
/// staff.
#[utoipa::path(
    put,
    path = "/products/{id}/stock",
    request_body = SetStockRequest,
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
        ("x-user-role" = Option<String>, Header, description = "manager | admin"),
    ),
    responses(
        (status = 200, description = "Stock updated", body = ProductResponse),
        (status = 400, description = "Negative quantity"),
        (status = 403, description = "Caller is not a manager or admin"),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn set_stock(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<SetStockRequest>,
) -> Result<HttpResponse, AppError> {
    let role = caller_role(&req)?;
    let id = path.into_inner();
    let quantity = body.into_inner().quantity;
    let products = state.products.clone();

    let product = web::block(move || products.set_stock(id, quantity, role)).await??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}
